//! Platform facts consulted during resolution.

/// Reports whether a CUDA-capable GPU is usable by this process.
pub trait GpuProbe {
    fn cuda_available(&self) -> bool;
}

/// A probe with a fixed answer, for tests and for callers that already know.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedGpuProbe(pub bool);

impl GpuProbe for FixedGpuProbe {
    fn cuda_available(&self) -> bool {
        self.0
    }
}

impl<P: GpuProbe + ?Sized> GpuProbe for &P {
    fn cuda_available(&self) -> bool {
        (**self).cuda_available()
    }
}
