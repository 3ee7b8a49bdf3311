//! Audio intake buffer

/// Append-only accumulator for normalised mono samples. `reset` truncates
/// without freeing, so repeated decodes reuse the allocation.
#[derive(Clone, Debug, Default)]
pub struct SampleBuffer {
    samples: Vec<f32>,
}

impl SampleBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, samples: &[f32]) {
        self.samples.extend_from_slice(samples);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Contiguous view of everything accumulated so far.
    pub fn view(&self) -> &[f32] {
        &self.samples
    }

    pub fn reset(&mut self) {
        self.samples.clear();
    }

    #[cfg(test)]
    fn capacity(&self) -> usize {
        self.samples.capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_appends_in_order() {
        let mut buffer = SampleBuffer::new();
        buffer.push(&[0.1, 0.2]);
        buffer.push(&[0.3]);
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.view(), &[0.1, 0.2, 0.3]);
    }

    #[test]
    fn reset_keeps_capacity() {
        let mut buffer = SampleBuffer::new();
        buffer.push(&vec![0.0; 4096]);
        let capacity = buffer.capacity();
        buffer.reset();
        assert!(buffer.is_empty());
        assert_eq!(buffer.capacity(), capacity);
    }
}
