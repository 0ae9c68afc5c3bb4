use chrono::{DateTime, Utc};

/// A named series of per-frame values recorded during a paired run.
#[derive(Clone, Default)]
pub struct FrameSeries {
    pub name: String,
    pub values: Vec<f64>,
}

impl FrameSeries {
    pub fn new(name: &str) -> FrameSeries {
        FrameSeries {
            name: name.to_string(),
            values: Vec::new(),
        }
    }

    pub fn push(&mut self, value: f64) {
        self.values.push(value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn sum(&self) -> f64 {
        self.values.iter().sum()
    }

    pub fn mean(&self) -> f64 {
        self.sum() / (self.values.len() as f64)
    }

    pub fn last(&self) -> f64 {
        match self.values.last() {
            Some(v) => *v,
            None => f64::NAN,
        }
    }

    /*
    Counts the frames on which the value changed from the previous frame.
    Handy for counting role flips from a recorded demand-mode series.
     */
    pub fn count_changes(&self) -> usize {
        let mut count = 0;
        for i in 1..self.values.len() {
            if self.values[i] != self.values[i - 1] {
                count += 1;
            }
        }
        count
    }
}

/// Collects named per-frame series during a paired run. Components look a
/// series up by name once at initialization and push by index afterwards.
#[derive(Clone)]
pub struct Recorder {
    pub series: Vec<FrameSeries>,
    pub started: DateTime<Utc>,
}

impl Recorder {
    pub fn new() -> Recorder {
        Recorder {
            series: Vec::new(),
            started: Utc::now(),
        }
    }

    /*
    Returns the index of the named series, creating it if necessary.
     */
    pub fn get_or_add_series(&mut self, name: &str) -> usize {
        if let Some(idx) = self.get_series_idx(name) {
            return idx;
        }
        self.series.push(FrameSeries::new(name));
        self.series.len() - 1
    }

    pub fn get_series_idx(&self, name: &str) -> Option<usize> {
        self.series.iter().position(|s| s.name == name)
    }

    pub fn add_value_at_index(&mut self, idx: usize, value: f64) {
        self.series[idx].push(value);
    }

    /*
    Number of recorded frames, taken as the longest series.
     */
    pub fn num_frames(&self) -> usize {
        self.series.iter().map(|s| s.len()).max().unwrap_or(0)
    }
}

impl Default for Recorder {
    fn default() -> Self {
        Recorder::new()
    }
}
