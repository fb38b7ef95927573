//! Backend for the Resunet demo binary.
//!
//! The `cuda` feature wins over `wgpu`; with neither enabled the demo runs
//! on the CPU `NdArray` backend, which is also what the library tests use.

use cfg_if::cfg_if;

cfg_if! {
    if #[cfg(feature = "cuda")] {
        use burn::backend::cuda::{Cuda, CudaDevice};

        /// Backend the demo model runs on
        pub type SelectedBackend = Cuda;
        /// Device of [`SelectedBackend`]
        pub type SelectedDevice = CudaDevice;

        /// Device the demo builds the model and its random inputs on
        pub fn create_device() -> SelectedDevice {
            CudaDevice::default()
        }

        /// Backend name reported in the demo's startup log line
        pub const fn get_backend_name() -> &'static str {
            "CUDA (NVIDIA GPU)"
        }
    } else if #[cfg(feature = "wgpu")] {
        use burn::backend::wgpu::{Wgpu, WgpuDevice};

        /// Backend the demo model runs on
        pub type SelectedBackend = Wgpu;
        /// Device of [`SelectedBackend`]
        pub type SelectedDevice = WgpuDevice;

        /// Device the demo builds the model and its random inputs on
        pub fn create_device() -> SelectedDevice {
            WgpuDevice::default()
        }

        /// Backend name reported in the demo's startup log line
        pub const fn get_backend_name() -> &'static str {
            "WGPU (GPU)"
        }
    } else {
        use burn::backend::ndarray::{NdArray, NdArrayDevice};

        /// Backend the demo model runs on
        pub type SelectedBackend = NdArray;
        /// Device of [`SelectedBackend`]
        pub type SelectedDevice = NdArrayDevice;

        /// Device the demo builds the model and its random inputs on
        pub fn create_device() -> SelectedDevice {
            NdArrayDevice::default()
        }

        /// Backend name reported in the demo's startup log line
        pub const fn get_backend_name() -> &'static str {
            "NdArray (CPU)"
        }
    }
}
