//! Uniformly partitioned FFT convolution.
//!
//! The impulse response is cut into blocks of `B` samples, each zero-padded
//! to `2B` and transformed once when the kernel is built. At run time every
//! completed input block is transformed, pushed onto a frequency-domain delay
//! line, multiplied against the kernel partitions and transformed back
//! (overlap-save). Cost per block is one forward and one inverse FFT plus one
//! complex multiply-add per partition, independent of the IR length.
//!
//! Latency is exactly one block. The live graph and the offline renderer use
//! the same block size, so both produce the same alignment.

use std::fmt;
use std::sync::Arc;

use rustfft::{Fft, FftPlanner, num_complex::Complex};
use tonearm_core::Effect;

/// Block size used by the engine's reverb.
pub const DEFAULT_BLOCK_SIZE: usize = 256;

/// Pre-transformed stereo impulse response, shared between convolvers.
pub struct ConvolutionKernel {
    block: usize,
    /// `[channel][partition][bin]`
    partitions: [Vec<Vec<Complex<f32>>>; 2],
    fft: Arc<dyn Fft<f32>>,
    ifft: Arc<dyn Fft<f32>>,
    ir_len: usize,
}

impl ConvolutionKernel {
    /// Build from one impulse response per output channel.
    ///
    /// An empty channel is treated as silence. `block` below 1 is raised to 1.
    pub fn new(left: &[f32], right: &[f32], block: usize) -> Self {
        let block = block.max(1);
        let fft_size = block * 2;
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);
        let ifft = planner.plan_fft_inverse(fft_size);

        let ir_len = left.len().max(right.len());
        let count = ir_len.div_ceil(block).max(1);

        let partition = |ir: &[f32]| -> Vec<Vec<Complex<f32>>> {
            (0..count)
                .map(|p| {
                    let mut buf = vec![Complex::new(0.0, 0.0); fft_size];
                    let start = (p * block).min(ir.len());
                    let end = ((p + 1) * block).min(ir.len());
                    for (slot, &h) in buf.iter_mut().zip(&ir[start..end]) {
                        slot.re = h;
                    }
                    fft.process(&mut buf);
                    buf
                })
                .collect()
        };

        Self {
            block,
            partitions: [partition(left), partition(right)],
            fft,
            ifft,
            ir_len,
        }
    }

    /// Kernel with the same IR on both channels.
    pub fn mono(ir: &[f32], block: usize) -> Self {
        Self::new(ir, ir, block)
    }

    /// Partition length in samples.
    pub fn block_size(&self) -> usize {
        self.block
    }

    /// Number of partitions per channel.
    pub fn partition_count(&self) -> usize {
        self.partitions[0].len()
    }

    /// Length of the longer source IR in samples.
    pub fn len(&self) -> usize {
        self.ir_len
    }

    /// True when built from two empty IRs.
    pub fn is_empty(&self) -> bool {
        self.ir_len == 0
    }
}

impl fmt::Debug for ConvolutionKernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConvolutionKernel")
            .field("block", &self.block)
            .field("partitions", &self.partition_count())
            .field("ir_len", &self.ir_len)
            .finish_non_exhaustive()
    }
}

/// Stereo convolver running one [`ConvolutionKernel`].
///
/// Left input is convolved with IR channel 0, right input with channel 1.
///
/// ```rust
/// use std::sync::Arc;
/// use tonearm_core::Effect;
/// use tonearm_effects::{ConvolutionKernel, Convolver};
///
/// let kernel = Arc::new(ConvolutionKernel::mono(&[1.0], 64));
/// let mut conv = Convolver::new(kernel);
/// assert_eq!(conv.latency_samples(), 64);
///
/// let out: Vec<f32> = (0..128).map(|i| conv.process(if i == 0 { 1.0 } else { 0.0 })).collect();
/// assert!((out[64] - 1.0).abs() < 1e-5);
/// ```
#[derive(Debug, Clone)]
pub struct Convolver {
    kernel: Arc<ConvolutionKernel>,
    /// Spectra of recent input blocks, newest at `fdl_head`
    fdl: [Vec<Vec<Complex<f32>>>; 2],
    fdl_head: usize,
    previous: [Vec<f32>; 2],
    input: [Vec<f32>; 2],
    output: [Vec<f32>; 2],
    pos: usize,
    work: Vec<Complex<f32>>,
    accum: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl Convolver {
    /// Silent convolver over `kernel`.
    pub fn new(kernel: Arc<ConvolutionKernel>) -> Self {
        let block = kernel.block;
        let fft_size = block * 2;
        let partitions = kernel.partition_count();
        let scratch_len = kernel
            .fft
            .get_inplace_scratch_len()
            .max(kernel.ifft.get_inplace_scratch_len());
        let zero = Complex::new(0.0, 0.0);
        let spectra = || vec![vec![zero; fft_size]; partitions];

        Self {
            fdl: [spectra(), spectra()],
            fdl_head: 0,
            previous: [vec![0.0; block], vec![0.0; block]],
            input: [vec![0.0; block], vec![0.0; block]],
            output: [vec![0.0; block], vec![0.0; block]],
            pos: 0,
            work: vec![zero; fft_size],
            accum: vec![zero; fft_size],
            scratch: vec![zero; scratch_len],
            kernel,
        }
    }

    /// The kernel in use.
    pub fn kernel(&self) -> &Arc<ConvolutionKernel> {
        &self.kernel
    }

    fn run_block(&mut self) {
        let block = self.kernel.block;
        let partitions = self.kernel.partition_count();
        let scale = 1.0 / (block * 2) as f32;
        self.fdl_head = (self.fdl_head + partitions - 1) % partitions;

        for ch in 0..2 {
            for (slot, &x) in self
                .work
                .iter_mut()
                .zip(self.previous[ch].iter().chain(self.input[ch].iter()))
            {
                *slot = Complex::new(x, 0.0);
            }
            self.kernel
                .fft
                .process_with_scratch(&mut self.work, &mut self.scratch);
            self.fdl[ch][self.fdl_head].copy_from_slice(&self.work);

            self.accum.fill(Complex::new(0.0, 0.0));
            for p in 0..partitions {
                let spectrum = &self.fdl[ch][(self.fdl_head + p) % partitions];
                let h = &self.kernel.partitions[ch][p];
                for ((acc, x), h) in self.accum.iter_mut().zip(spectrum).zip(h) {
                    *acc += x * h;
                }
            }
            self.kernel
                .ifft
                .process_with_scratch(&mut self.accum, &mut self.scratch);

            for (out, y) in self.output[ch].iter_mut().zip(&self.accum[block..]) {
                *out = y.re * scale;
            }
            self.previous[ch].copy_from_slice(&self.input[ch]);
        }
    }
}

impl Effect for Convolver {
    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        self.process_stereo(input, input).0
    }

    #[inline]
    fn process_stereo(&mut self, left: f32, right: f32) -> (f32, f32) {
        let out = (self.output[0][self.pos], self.output[1][self.pos]);
        self.input[0][self.pos] = left;
        self.input[1][self.pos] = right;
        self.pos += 1;
        if self.pos == self.kernel.block {
            self.run_block();
            self.pos = 0;
        }
        out
    }

    fn set_sample_rate(&mut self, _sample_rate: f32) {
        // The kernel is rate-specific; the graph swaps kernels instead.
        self.reset();
    }

    fn reset(&mut self) {
        for ch in 0..2 {
            self.previous[ch].fill(0.0);
            self.input[ch].fill(0.0);
            self.output[ch].fill(0.0);
            for spectrum in &mut self.fdl[ch] {
                spectrum.fill(Complex::new(0.0, 0.0));
            }
        }
        self.pos = 0;
        self.fdl_head = 0;
    }

    fn latency_samples(&self) -> usize {
        self.kernel.block
    }
}
