use crate::{Result, SweepErr, arch::LayerTopology};

/// The widest parity problem that can be generated, it has `2^20` samples.
pub const MAX_PARITY_BITS: usize = 20;

/// An ordered, read-only set of training samples.
///
/// The samples are stored flat, one row per sample: the `x_size` input values followed by the
/// `y_size` expected output values.
#[derive(Clone, Debug, PartialEq)]
pub struct Dataset {
    data: Box<[f32]>,
    x_size: usize,
    y_size: usize,
}

impl Dataset {
    /// Creates a new `Dataset`.
    ///
    /// # Arguments
    /// * `data` - The flat rows of the dataset.
    /// * `x_size` - The width of the inputs.
    /// * `y_size` - The width of the expected outputs.
    ///
    /// # Returns
    /// A `ShapeMismatch` error if the data is empty or isn't made of whole rows.
    pub fn new(data: Vec<f32>, x_size: usize, y_size: usize) -> Result<Self> {
        let row = x_size + y_size;

        if x_size == 0 || y_size == 0 || data.is_empty() || data.len() % row != 0 {
            return Err(SweepErr::ShapeMismatch {
                what: "dataset rows",
                got: data.len(),
                expected: row,
            });
        }

        Ok(Self {
            data: data.into_boxed_slice(),
            x_size,
            y_size,
        })
    }

    /// Builds the `bits`-wide parity problem: every input vector of `bits` booleans, in
    /// counting order, with every one of the `outputs` expected values set to the parity bit.
    ///
    /// # Arguments
    /// * `bits` - The width of the inputs.
    /// * `outputs` - The width of the expected outputs.
    ///
    /// # Returns
    /// An `InvalidConfig` error if `bits` exceeds `MAX_PARITY_BITS` or the samples wouldn't fit
    /// in memory.
    pub fn parity(bits: usize, outputs: usize) -> Result<Self> {
        if bits > MAX_PARITY_BITS {
            return Err(SweepErr::InvalidConfig(format!(
                "parity problems are limited to {MAX_PARITY_BITS} bits, got {bits}"
            )));
        }

        let rows = 1usize << bits;
        let len = bits
            .checked_add(outputs)
            .and_then(|row| row.checked_mul(rows))
            .ok_or_else(|| {
                SweepErr::InvalidConfig(format!(
                    "{bits}-bit parity with {outputs} outputs is too large"
                ))
            })?;
        let mut data = Vec::with_capacity(len);

        for row in 0..rows {
            // Most significant bit first, so row 1 is 0,..,0,1.
            let input = (0..bits).rev().map(|b| ((row >> b) & 1) as f32);
            data.extend(input);

            let parity = (row.count_ones() % 2) as f32;
            data.extend(std::iter::repeat_n(parity, outputs));
        }

        Self::new(data, bits, outputs)
    }

    pub fn len(&self) -> usize {
        self.data.len() / (self.x_size + self.y_size)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn x_size(&self) -> usize {
        self.x_size
    }

    pub fn y_size(&self) -> usize {
        self.y_size
    }

    /// Returns the `(input, expected)` pair of the `i`-th sample.
    pub fn sample(&self, i: usize) -> (&[f32], &[f32]) {
        let row = self.x_size + self.y_size;
        let start = i * row;
        self.data[start..start + row].split_at(self.x_size)
    }

    /// Iterates the samples in their stored order.
    pub fn samples(&self) -> impl Iterator<Item = (&[f32], &[f32])> {
        self.data
            .chunks_exact(self.x_size + self.y_size)
            .map(|row| row.split_at(self.x_size))
    }

    /// Checks that the samples fit the input and output layers of `topology`.
    ///
    /// # Returns
    /// A `ShapeMismatch` error naming the first mismatching side.
    pub fn check_topology(&self, topology: &LayerTopology) -> Result<()> {
        if self.x_size != topology.input_width() {
            return Err(SweepErr::ShapeMismatch {
                what: "dataset inputs",
                got: self.x_size,
                expected: topology.input_width(),
            });
        }

        if self.y_size != topology.output_width() {
            return Err(SweepErr::ShapeMismatch {
                what: "dataset outputs",
                got: self.y_size,
                expected: topology.output_width(),
            });
        }

        Ok(())
    }
}
