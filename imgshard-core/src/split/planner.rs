use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::index::classes::Sample;

/// Every run shuffles with the same seed, so a dataset always splits the same way.
pub const SPLIT_SEED: u64 = 42;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Split {
    Train,
    Val,
    Test,
}

impl Split {
    pub const ALL: [Split; 3] = [Split::Train, Split::Val, Split::Test];

    pub fn as_str(self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Val => "val",
            Split::Test => "test",
        }
    }
}

impl std::fmt::Display for Split {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Default)]
pub struct SplitSet {
    pub train: Vec<Sample>,
    pub val: Vec<Sample>,
    pub test: Vec<Sample>,
}

impl SplitSet {
    pub fn get(&self, split: Split) -> &[Sample] {
        match split {
            Split::Train => &self.train,
            Split::Val => &self.val,
            Split::Test => &self.test,
        }
    }
}

/// `floor(total * (1 - val_fraction))`, clamped to `total`.
pub fn split_point(total: usize, val_fraction: f64) -> usize {
    let keep = (total as f64 * (1.0 - val_fraction)).floor();
    if keep <= 0.0 {
        0
    } else {
        (keep as usize).min(total)
    }
}

pub fn shuffle(samples: &mut [Sample]) {
    let mut rng = ChaCha8Rng::seed_from_u64(SPLIT_SEED);
    samples.shuffle(&mut rng);
}

/// Shuffle the train pool and carve off a validation tail.
///
/// When the archive shipped its own test folder (`test` is `Some`) the
/// fraction is ignored: no validation set is produced and the test samples
/// are taken as they are.
pub fn plan(mut train: Vec<Sample>, test: Option<Vec<Sample>>, val_fraction: f64) -> SplitSet {
    shuffle(&mut train);
    match test {
        Some(test) => SplitSet {
            train,
            val: Vec::new(),
            test,
        },
        None if val_fraction > 0.0 => {
            let at = split_point(train.len(), val_fraction);
            let val = train.split_off(at);
            SplitSet {
                train,
                val,
                test: Vec::new(),
            }
        }
        None => SplitSet {
            train,
            ..Default::default()
        },
    }
}
