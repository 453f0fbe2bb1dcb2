//! fluorin-plms
//!
//! Frozen protein language model encoders that turn a residue list into a
//! per-residue embedding matrix.
//!
//! - [AMPLIFY](https://github.com/chandar-lab/AMPLIFY), weights from
//!   [HF - 120M](https://huggingface.co/chandar-lab/AMPLIFY_120M) and
//!   [HF - 350M](https://huggingface.co/chandar-lab/AMPLIFY_350M)
//! - a one-hot baseline that needs no weights
//!
//! ```shell
//! cargo run --bin fluorin -- embed --encoder amplify-120m --out embeddings
//! cargo run --bin fluorin --features metal -- embed --encoder amplify-120m --out embeddings
//! ```
use candle_core::utils::{cuda_is_available, metal_is_available};
use candle_core::{Device, Result};

pub use amplify::amplify::{ModelOutput, AMPLIFY};
pub use amplify::amplify_runner::{AmplifyModels, AmplifyRunner};
pub use amplify::config::AMPLIFYConfig;
pub use encoder::{EncoderKind, ResidueEncoder};
pub use onehot::OneHotEncoder;

pub mod amplify;
pub mod encoder;
pub mod onehot;

pub fn device(cpu: bool) -> Result<Device> {
    if cpu {
        Ok(Device::Cpu)
    } else if cuda_is_available() {
        Ok(Device::new_cuda(0)?)
    } else if metal_is_available() {
        Ok(Device::new_metal(0)?)
    } else {
        #[cfg(all(target_os = "macos", target_arch = "aarch64"))]
        {
            tracing::info!("Running on CPU, to run on GPU(metal), build with `--features metal`");
        }
        #[cfg(not(all(target_os = "macos", target_arch = "aarch64")))]
        {
            tracing::info!("Running on CPU, to run on GPU, build with `--features cuda`");
        }
        Ok(Device::Cpu)
    }
}
