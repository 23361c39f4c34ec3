use crate::config::TrackerConfig;
use std::collections::{HashMap, HashSet, VecDeque};

/// Bounded set of submission ids that no longer need mirroring
///
/// An id lands here once its submission was posted, was rejected as a
/// duplicate at the destination, or was given up on. Membership is the only
/// thing that prevents a re-post, so ids are never removed except by
/// [`ProcessedSet::trim`].
///
/// The set also keeps a ledger of how many poll cycles each unprocessed id has
/// been abandoned for, which drives the optional `max-deferrals` policy.
#[derive(Debug, Clone)]
pub struct ProcessedSet {
    ids: HashSet<String>,
    /// Insertion order, oldest first; trim evicts from the front
    order: VecDeque<String>,
    deferrals: HashMap<String, u32>,
    high_water: usize,
    low_water: usize,
}

impl ProcessedSet {
    /// Creates an empty set that trims to `low_water` once it reaches `high_water`
    pub fn new(high_water: usize, low_water: usize) -> Self {
        Self {
            ids: HashSet::new(),
            order: VecDeque::new(),
            deferrals: HashMap::new(),
            high_water,
            low_water: low_water.min(high_water),
        }
    }

    pub fn from_config(config: &TrackerConfig) -> Self {
        Self::new(config.high_water, config.low_water)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Marks `id` as processed and forgets its deferrals
    ///
    /// Returns `false` if the id was already present.
    pub fn add(&mut self, id: &str) -> bool {
        self.deferrals.remove(id);

        if !self.ids.insert(id.to_string()) {
            return false;
        }
        self.order.push_back(id.to_string());
        true
    }

    /// Evicts the oldest ids once the set has reached its high-water mark
    ///
    /// Returns the number of ids evicted. After a trim the set holds at most
    /// `low_water` ids.
    pub fn trim(&mut self) -> usize {
        if self.deferrals.len() >= self.high_water {
            let excess = self.deferrals.len() - self.low_water;
            let dropped: Vec<String> = self.deferrals.keys().take(excess).cloned().collect();
            for id in dropped {
                self.deferrals.remove(&id);
            }
        }

        if self.ids.len() < self.high_water {
            return 0;
        }

        let mut evicted = 0;
        while self.ids.len() > self.low_water {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.ids.remove(&oldest);
                    evicted += 1;
                }
                None => break,
            }
        }

        evicted
    }

    /// Records one more abandoned cycle for `id` and returns the new count
    pub fn defer(&mut self, id: &str) -> u32 {
        let count = self.deferrals.entry(id.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    pub fn deferrals(&self, id: &str) -> u32 {
        self.deferrals.get(id).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn high_water(&self) -> usize {
        self.high_water
    }

    pub fn low_water(&self) -> usize {
        self.low_water
    }
}

impl Default for ProcessedSet {
    fn default() -> Self {
        Self::from_config(&TrackerConfig::default())
    }
}
