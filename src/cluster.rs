use crate::error::{DlaError, Result};
use crate::geometry::{Point, PointKey};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Where a cluster entry hangs in the stick tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Parent {
    /// The seed entry
    Root,
    /// Back-reference to the entry this one stuck to, resolved through the store
    Ref(PointKey),
}

/// One lattice cell that has permanently stuck to the aggregate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterEntry {
    pub point: Point,
    pub parent: Parent,
    /// Hops back to the seed along stick-parent links
    pub distance: u32,
}

impl ClusterEntry {
    pub fn is_root(&self) -> bool {
        self.parent == Parent::Root
    }
}

/// Summary of entry distances. Empty input yields [`DistanceStats::EMPTY`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceStats {
    pub count: usize,
    pub min: Option<u32>,
    pub max: Option<u32>,
    /// NaN when `count == 0`
    pub mean: f64,
}

impl DistanceStats {
    pub const EMPTY: DistanceStats = DistanceStats {
        count: 0,
        min: None,
        max: None,
        mean: f64::NAN,
    };

    pub fn from_distances(distances: impl IntoIterator<Item = u32>) -> Self {
        let mut stats = Self::EMPTY;
        let mut total: u64 = 0;
        for d in distances {
            stats.count += 1;
            total += d as u64;
            stats.min = Some(stats.min.map_or(d, |m| m.min(d)));
            stats.max = Some(stats.max.map_or(d, |m| m.max(d)));
        }
        if stats.count > 0 {
            stats.mean = total as f64 / stats.count as f64;
        }
        stats
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Authoritative record of every stuck particle and its stick-tree parent.
///
/// The store owns all entries. Parents are looked up by key, and entries are
/// append-only during simulation, so a `Parent::Ref` never dangles.
#[derive(Debug, Clone)]
pub struct ClusterStore {
    width: usize,
    height: usize,
    entries: HashMap<PointKey, ClusterEntry>,
    /// Keys in stick order; parents always precede their children
    order: Vec<PointKey>,
}

impl ClusterStore {
    /// Store holding only the seed at the lattice center
    pub fn new(width: usize, height: usize) -> Result<Self> {
        let mut store = Self::empty(width, height)?;
        let seed = Point::center_of(width, height);
        store.push(ClusterEntry {
            point: seed,
            parent: Parent::Root,
            distance: 0,
        });
        Ok(store)
    }

    fn empty(width: usize, height: usize) -> Result<Self> {
        DlaError::check_dimensions(width, height)?;
        Ok(Self {
            width,
            height,
            entries: HashMap::new(),
            order: Vec::new(),
        })
    }

    /// Rebuild a store from entries in stick order, checking the tree invariants
    pub fn from_entries(
        width: usize,
        height: usize,
        entries: impl IntoIterator<Item = ClusterEntry>,
    ) -> Result<Self> {
        let mut store = Self::empty(width, height)?;
        let mut has_root = false;

        for entry in entries {
            if !entry.point.in_bounds(width, height) {
                return Err(DlaError::out_of_bounds(entry.point, width, height));
            }
            if store.contains(entry.point) {
                return Err(DlaError::duplicate(entry.point));
            }
            match entry.parent {
                Parent::Root => {
                    if has_root {
                        return Err(DlaError::InvariantViolation(format!(
                            "second root at {}",
                            entry.point
                        )));
                    }
                    if entry.distance != 0 {
                        return Err(DlaError::InvariantViolation(format!(
                            "root {} has distance {}",
                            entry.point, entry.distance
                        )));
                    }
                    has_root = true;
                }
                Parent::Ref(key) => {
                    let parent = store.entries.get(&key).ok_or_else(|| {
                        DlaError::missing_parent(entry.point, key.to_point(width))
                    })?;
                    if entry.distance != parent.distance + 1 {
                        return Err(DlaError::InvariantViolation(format!(
                            "{} has distance {} but its parent is at {}",
                            entry.point, entry.distance, parent.distance
                        )));
                    }
                }
            }
            store.push(entry);
        }

        if !has_root {
            return Err(DlaError::InvariantViolation(
                "cluster has no root entry".to_string(),
            ));
        }
        Ok(store)
    }

    fn push(&mut self, entry: ClusterEntry) {
        let key = entry.point.key(self.width);
        self.order.push(key);
        self.entries.insert(key, entry);
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, point: Point) -> bool {
        point.in_bounds(self.width, self.height)
            && self.entries.contains_key(&point.key(self.width))
    }

    pub fn get(&self, point: Point) -> Option<&ClusterEntry> {
        if !point.in_bounds(self.width, self.height) {
            return None;
        }
        self.entries.get(&point.key(self.width))
    }

    /// The seed entry
    pub fn root(&self) -> Option<&ClusterEntry> {
        self.order
            .first()
            .and_then(|key| self.entries.get(key))
            .filter(|entry| entry.is_root())
    }

    pub fn parent_of(&self, entry: &ClusterEntry) -> Option<&ClusterEntry> {
        match entry.parent {
            Parent::Root => None,
            Parent::Ref(key) => self.entries.get(&key),
        }
    }

    /// Stick `point` onto the existing entry at `parent_point`
    pub fn insert(&mut self, point: Point, parent_point: Point) -> Result<&ClusterEntry> {
        if !point.in_bounds(self.width, self.height) {
            return Err(DlaError::out_of_bounds(point, self.width, self.height));
        }
        if self.contains(point) {
            return Err(DlaError::duplicate(point));
        }
        let parent = self
            .get(parent_point)
            .ok_or_else(|| DlaError::missing_parent(point, parent_point))?;

        let entry = ClusterEntry {
            point,
            parent: Parent::Ref(parent_point.key(self.width)),
            distance: parent.distance + 1,
        };
        let key = point.key(self.width);
        self.push(entry);
        Ok(&self.entries[&key])
    }

    /// All entries in stick order
    pub fn entries(&self) -> impl Iterator<Item = &ClusterEntry> + '_ {
        self.order.iter().filter_map(move |key| self.entries.get(key))
    }

    /// Walk from `point` up to the seed, yielding `point`'s own entry first
    pub fn ancestors(&self, point: Point) -> Ancestors<'_> {
        Ancestors {
            store: self,
            next: self.get(point),
        }
    }

    pub fn distance_stats(&self) -> DistanceStats {
        DistanceStats::from_distances(self.entries().map(|e| e.distance))
    }

    /// Remove every non-seed entry within `radius` of `center`, together with
    /// all of their descendants. Returns how many entries were removed.
    pub fn erase_within(&mut self, center: Point, radius: u32) -> usize {
        let radius_sq = radius as i64 * radius as i64;
        let mut removed: HashSet<PointKey> = HashSet::new();

        // order lists parents before children, so one pass sees every cascade
        for key in &self.order {
            let entry = &self.entries[key];
            let doomed = match entry.parent {
                Parent::Root => false,
                Parent::Ref(parent) => {
                    removed.contains(&parent) || entry.point.distance_squared(center) <= radius_sq
                }
            };
            if doomed {
                removed.insert(*key);
            }
        }

        if removed.is_empty() {
            return 0;
        }
        self.order.retain(|key| !removed.contains(key));
        self.entries.retain(|key, _| !removed.contains(key));
        removed.len()
    }

    /// Owned copy of all entries, suitable for crossing a thread boundary
    pub fn to_entries(&self) -> Vec<ClusterEntry> {
        self.entries().cloned().collect()
    }
}

/// Iterator over an entry and its stick-tree ancestors
pub struct Ancestors<'a> {
    store: &'a ClusterStore,
    next: Option<&'a ClusterEntry>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a ClusterEntry;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.store.parent_of(current);
        Some(current)
    }
}
