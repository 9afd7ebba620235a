/// Cyclic cursor over the year attributes
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SequenceController {
    index: usize,
    len: usize,
}

impl SequenceController {
    /// Start at index 0. `None` when there is nothing to step through.
    pub fn new(len: usize) -> Option<Self> {
        (len > 0).then_some(Self { index: 0, len })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.len
    }

    /// Step to the next attribute, wrapping from the last to the first
    pub fn forward(&mut self) -> usize {
        self.index = (self.index + 1) % self.len;
        self.index
    }

    /// Step to the previous attribute, wrapping from the first to the last
    pub fn backward(&mut self) -> usize {
        self.index = (self.index + self.len - 1) % self.len;
        self.index
    }

    /// Jump directly to an attribute. Out-of-range input is clamped to the last index.
    pub fn set_index(&mut self, index: usize) -> usize {
        self.index = index.min(self.len - 1);
        self.index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backward_wraps() {
        let mut seq = SequenceController::new(9).unwrap();
        assert_eq!(seq.index(), 0);
        assert_eq!(seq.backward(), 8);
    }

    #[test]
    fn test_forward_wraps() {
        let mut seq = SequenceController::new(9).unwrap();
        seq.set_index(8);
        assert_eq!(seq.forward(), 0);
    }

    #[test]
    fn test_full_cycle() {
        let mut seq = SequenceController::new(4).unwrap();
        for _ in 0..4 {
            seq.forward();
        }
        assert_eq!(seq.index(), 0);
        for expected in [3, 2, 1, 0] {
            assert_eq!(seq.backward(), expected);
        }
    }

    #[test]
    fn test_set_index_clamps() {
        let mut seq = SequenceController::new(3).unwrap();
        assert_eq!(seq.set_index(1), 1);
        assert_eq!(seq.set_index(42), 2);
    }

    #[test]
    fn test_single_attribute() {
        let mut seq = SequenceController::new(1).unwrap();
        assert_eq!(seq.forward(), 0);
        assert_eq!(seq.backward(), 0);
        assert!(SequenceController::new(0).is_none());
    }
}
