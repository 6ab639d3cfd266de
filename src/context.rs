//! Live simulation values and the read-only view expressions evaluate against.

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
    evaluator::EvalError,
    tables::UserTable,
    value::{UdqSet, VarType},
};

/// Current values of summary vectors and evaluated quantities.
///
/// Values are keyed by keyword first, then by entity. Entities are
/// registered in first-seen order, which is the order sets are built in.
///
/// # Examples
///
/// ```
/// use udq_lang::SummaryState;
///
/// let mut st = SummaryState::new();
/// st.update_well_var("PROD1", "WOPR", 300.0);
/// st.update("FLPR", 1200.0);
///
/// assert_eq!(st.get_well_var("PROD1", "WOPR"), Some(300.0));
/// assert_eq!(st.wells(), ["PROD1".to_string()]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryState {
    wells: Vec<String>,
    groups: Vec<String>,
    field: IndexMap<String, f64>,
    well: IndexMap<String, IndexMap<String, f64>>,
    group: IndexMap<String, IndexMap<String, f64>>,
    /// keyword -> region set -> region -> value
    region: IndexMap<String, IndexMap<String, IndexMap<usize, f64>>>,
    region_sets: IndexMap<String, Vec<usize>>,
    /// keyword -> well -> segment -> value
    segment: IndexMap<String, IndexMap<String, IndexMap<usize, f64>>>,
    segments: IndexMap<String, Vec<usize>>,
}

impl SummaryState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_well(&mut self, well: &str) {
        if !self.wells.iter().any(|w| w == well) {
            self.wells.push(well.to_string());
        }
    }

    pub fn add_group(&mut self, group: &str) {
        if !self.groups.iter().any(|g| g == group) {
            self.groups.push(group.to_string());
        }
    }

    pub fn wells(&self) -> &[String] {
        &self.wells
    }

    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    /// Region numbers of a region set, ascending.
    pub fn regions(&self, region_set: &str) -> &[usize] {
        self.region_sets.get(region_set).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every (well, segment) pair of multi-segment wells.
    pub fn segments(&self) -> Vec<(String, usize)> {
        self.segments
            .iter()
            .flat_map(|(well, segs)| segs.iter().map(move |s| (well.clone(), *s)))
            .collect()
    }

    /// Registers every entity that holds a value.
    ///
    /// A state read from JSON may only list values; entity lists are
    /// rebuilt from them in first-seen order.
    pub fn register_entities(&mut self) {
        let wells: Vec<String> = self.well.values().flat_map(|values| values.keys().cloned()).collect();
        for well in &wells {
            self.add_well(well);
        }
        let groups: Vec<String> = self.group.values().flat_map(|values| values.keys().cloned()).collect();
        for group in &groups {
            self.add_group(group);
        }
        for sets in self.region.values() {
            for (region_set, values) in sets {
                let regions = self.region_sets.entry(region_set.clone()).or_default();
                for region in values.keys() {
                    if let Err(at) = regions.binary_search(region) {
                        regions.insert(at, *region);
                    }
                }
            }
        }
        for wells in self.segment.values() {
            for (well, values) in wells {
                let segments = self.segments.entry(well.clone()).or_default();
                for segment in values.keys() {
                    if let Err(at) = segments.binary_search(segment) {
                        segments.insert(at, *segment);
                    }
                }
            }
        }
    }

    // Field

    pub fn update(&mut self, key: &str, value: f64) {
        self.field.insert(key.to_string(), value);
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.field.get(key).copied()
    }

    pub fn has(&self, key: &str) -> bool {
        self.field.contains_key(key)
    }

    // Wells

    pub fn update_well_var(&mut self, well: &str, key: &str, value: f64) {
        self.add_well(well);
        self.well
            .entry(key.to_string())
            .or_default()
            .insert(well.to_string(), value);
    }

    pub fn get_well_var(&self, well: &str, key: &str) -> Option<f64> {
        self.well.get(key).and_then(|values| values.get(well)).copied()
    }

    pub fn has_well_var(&self, well: &str, key: &str) -> bool {
        self.get_well_var(well, key).is_some()
    }

    /// Whether any well has a value for `key`.
    pub fn has_well_keyword(&self, key: &str) -> bool {
        self.well.contains_key(key)
    }

    // Groups

    pub fn update_group_var(&mut self, group: &str, key: &str, value: f64) {
        self.add_group(group);
        self.group
            .entry(key.to_string())
            .or_default()
            .insert(group.to_string(), value);
    }

    pub fn get_group_var(&self, group: &str, key: &str) -> Option<f64> {
        self.group.get(key).and_then(|values| values.get(group)).copied()
    }

    pub fn has_group_keyword(&self, key: &str) -> bool {
        self.group.contains_key(key)
    }

    // Regions

    pub fn update_region_var(&mut self, key: &str, region_set: &str, region: usize, value: f64) {
        let regions = self.region_sets.entry(region_set.to_string()).or_default();
        if let Err(at) = regions.binary_search(&region) {
            regions.insert(at, region);
        }
        self.region
            .entry(key.to_string())
            .or_default()
            .entry(region_set.to_string())
            .or_default()
            .insert(region, value);
    }

    pub fn get_region_var(&self, key: &str, region_set: &str, region: usize) -> Option<f64> {
        self.region
            .get(key)
            .and_then(|sets| sets.get(region_set))
            .and_then(|values| values.get(&region))
            .copied()
    }

    pub fn has_region_keyword(&self, key: &str, region_set: &str) -> bool {
        self.region
            .get(key)
            .is_some_and(|sets| sets.contains_key(region_set))
    }

    // Segments

    pub fn update_segment_var(&mut self, well: &str, key: &str, segment: usize, value: f64) {
        let segments = self.segments.entry(well.to_string()).or_default();
        if let Err(at) = segments.binary_search(&segment) {
            segments.insert(at, segment);
        }
        self.segment
            .entry(key.to_string())
            .or_default()
            .entry(well.to_string())
            .or_default()
            .insert(segment, value);
    }

    pub fn get_segment_var(&self, well: &str, key: &str, segment: usize) -> Option<f64> {
        self.segment
            .get(key)
            .and_then(|wells| wells.get(well))
            .and_then(|values| values.get(&segment))
            .copied()
    }

    pub fn has_segment_keyword(&self, key: &str) -> bool {
        self.segment.contains_key(key)
    }

    /// Stores an evaluated quantity so later expressions can reference it.
    ///
    /// Undefined entries remove any previous value.
    pub fn update_udq(&mut self, set: &UdqSet) {
        let key = set.name().to_string();
        match set.var_type() {
            VarType::Well => {
                // keep the keyword registered even when nothing is defined
                self.well.entry(key.clone()).or_default();
                for entry in set {
                    match entry.value {
                        Some(v) => self.update_well_var(&entry.name, &key, v),
                        None => {
                            if let Some(values) = self.well.get_mut(&key) {
                                values.shift_remove(&entry.name);
                            }
                        }
                    }
                }
            }
            VarType::Group => {
                self.group.entry(key.clone()).or_default();
                for entry in set {
                    match entry.value {
                        Some(v) => self.update_group_var(&entry.name, &key, v),
                        None => {
                            if let Some(values) = self.group.get_mut(&key) {
                                values.shift_remove(&entry.name);
                            }
                        }
                    }
                }
            }
            VarType::Region => {
                for entry in set {
                    let Some(region) = entry.number else { continue };
                    match entry.value {
                        Some(v) => self.update_region_var(&key, &entry.name, region, v),
                        None => {
                            if let Some(values) = self
                                .region
                                .get_mut(&key)
                                .and_then(|sets| sets.get_mut(&entry.name))
                            {
                                values.shift_remove(&region);
                            }
                        }
                    }
                }
            }
            VarType::Segment => {
                for entry in set {
                    let Some(segment) = entry.number else { continue };
                    match entry.value {
                        Some(v) => self.update_segment_var(&entry.name, &key, segment, v),
                        None => {
                            if let Some(values) = self
                                .segment
                                .get_mut(&key)
                                .and_then(|wells| wells.get_mut(&entry.name))
                            {
                                values.shift_remove(&segment);
                            }
                        }
                    }
                }
            }
            _ => match set.scalar_value() {
                Some(v) => self.update(&key, v),
                None => {
                    self.field.shift_remove(&key);
                }
            },
        }
    }
}

/// Read-only view of one evaluation epoch: summary values plus user tables.
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    summary: &'a SummaryState,
    tables: Option<&'a IndexMap<String, UserTable>>,
}

impl<'a> EvalContext<'a> {
    pub fn new(summary: &'a SummaryState) -> Self {
        EvalContext {
            summary,
            tables: None,
        }
    }

    pub fn with_tables(self, tables: &'a IndexMap<String, UserTable>) -> Self {
        EvalContext {
            tables: Some(tables),
            ..self
        }
    }

    pub fn summary(&self) -> &'a SummaryState {
        self.summary
    }

    pub fn table(&self, name: &str) -> Option<&'a UserTable> {
        self.tables.and_then(|tables| tables.get(name))
    }

    pub fn wells(&self) -> &'a [String] {
        self.summary.wells()
    }

    pub fn groups(&self) -> &'a [String] {
        self.summary.groups()
    }

    /// Wells matching any of `patterns`; all wells when there are none.
    pub fn matching_wells(&self, patterns: &[String]) -> Result<Vec<String>, EvalError> {
        match_names(self.wells(), patterns)
    }

    pub fn matching_groups(&self, patterns: &[String]) -> Result<Vec<String>, EvalError> {
        match_names(self.groups(), patterns)
    }
}

/// Names matching any of `patterns`, in the order of `names`.
///
/// `*` matches any run of characters and `?` a single character.
pub fn match_names(names: &[String], patterns: &[String]) -> Result<Vec<String>, EvalError> {
    if patterns.is_empty() {
        return Ok(names.to_vec());
    }
    let regexes = patterns
        .iter()
        .map(|p| pattern_regex(p))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names
        .iter()
        .filter(|name| regexes.iter().any(|re| re.is_match(name)))
        .cloned()
        .collect())
}

pub fn pattern_regex(pattern: &str) -> Result<Regex, EvalError> {
    let escaped = regex::escape(pattern)
        .replace(r"\*", ".*")
        .replace(r"\?", ".");
    Regex::new(&format!("^{}$", escaped)).map_err(|_| EvalError::InvalidPattern {
        pattern: pattern.to_string(),
    })
}
