use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum SplitName {
    Train,
    Validation,
    Test,
}

/// One value per dataset split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Splits<T> {
    pub train: T,
    pub validation: T,
    pub test: T,
}

impl<T> Splits<T> {
    pub fn get(&self, name: SplitName) -> &T {
        match name {
            SplitName::Train => &self.train,
            SplitName::Validation => &self.validation,
            SplitName::Test => &self.test,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (SplitName, &T)> {
        [
            (SplitName::Train, &self.train),
            (SplitName::Validation, &self.validation),
            (SplitName::Test, &self.test),
        ]
        .into_iter()
    }

    /// Apply `f` to each split in train, validation, test order, stopping at the first error.
    pub fn try_map<U, E>(
        self,
        mut f: impl FnMut(SplitName, T) -> Result<U, E>,
    ) -> Result<Splits<U>, E> {
        Ok(Splits {
            train: f(SplitName::Train, self.train)?,
            validation: f(SplitName::Validation, self.validation)?,
            test: f(SplitName::Test, self.test)?,
        })
    }
}
