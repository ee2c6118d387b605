/// Anything positioned on a track's timeline by its start offset in seconds.
pub trait Timing {
    fn start(&self) -> f64;
}

/// An ordered run of intervals supporting floor lookup by offset.
///
/// Sorted by start once at construction (stable, so equal starts keep their
/// input order) and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct Timeline<T> {
    items: Vec<T>,
}

impl<T: Timing> Timeline<T> {
    pub fn new(mut items: Vec<T>) -> Self {
        items.sort_by(|a, b| a.start().total_cmp(&b.start()));
        Self { items }
    }

    /// Index of the rightmost interval starting at or before `offset`.
    pub fn index_at(&self, offset: f64) -> Option<usize> {
        let index = self.items.partition_point(|item| item.start() <= offset);
        index.checked_sub(1)
    }

    /// The latest interval starting at or before `offset`. This does not check
    /// that `offset` falls inside the interval's duration.
    pub fn at(&self, offset: f64) -> Option<&T> {
        self.index_at(offset).map(|index| &self.items[index])
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }
}

impl<T> Default for Timeline<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Timing> From<Vec<T>> for Timeline<T> {
    fn from(items: Vec<T>) -> Self {
        Self::new(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Section;

    fn sections(spans: &[(f64, f64)]) -> Timeline<Section> {
        Timeline::new(
            spans
                .iter()
                .map(|(start, duration)| Section::new(*start, *duration))
                .collect(),
        )
    }

    #[test]
    fn test_floor_lookup() {
        let timeline = sections(&[(0.0, 10.0), (10.0, 5.0), (20.0, 8.0)]);

        assert_eq!(timeline.at(5.0).map(|s| s.start), Some(0.0));
        assert_eq!(timeline.at(15.0).map(|s| s.start), Some(10.0));
        assert!(timeline.at(-1.0).is_none());
        assert_eq!(timeline.at(20.0).map(|s| s.start), Some(20.0));
        // Past the end of the last interval still resolves to it
        assert_eq!(timeline.at(500.0).map(|s| s.start), Some(20.0));
    }

    #[test]
    fn test_empty_timeline() {
        let timeline: Timeline<Section> = Timeline::default();
        assert!(timeline.at(0.0).is_none());
        assert!(timeline.index_at(100.0).is_none());
        assert!(timeline.is_empty());
    }

    #[test]
    fn test_construction_sorts_stably() {
        let mut first = Section::new(5.0, 1.0);
        first.loudness = Some(-1.0);
        let mut second = Section::new(5.0, 2.0);
        second.loudness = Some(-2.0);

        let timeline = Timeline::new(vec![
            Section::new(9.0, 1.0),
            first,
            Section::new(0.0, 5.0),
            second,
        ]);

        let starts: Vec<f64> = timeline.iter().map(|s| s.start).collect();
        assert_eq!(starts, vec![0.0, 5.0, 5.0, 9.0]);
        assert_eq!(timeline.get(1).and_then(|s| s.loudness), Some(-1.0));
        assert_eq!(timeline.get(2).and_then(|s| s.loudness), Some(-2.0));
        // Ties resolve to the last of the equal starts
        assert_eq!(timeline.index_at(5.0), Some(2));
    }
}
