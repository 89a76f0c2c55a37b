use std::sync::Arc;

use winit::window::Window;

use crate::error::HostError;
use crate::gpu::WgpuContext;
use crate::surface::{FrameHandle, Surface};
use crate::types::LayoutSize;

/// A winit window acting as a shader [`Surface`].
///
/// Frame requests map onto `request_redraw`. Only the most recent request is
/// outstanding; the event loop claims it with [`WindowSurface::take_due_frame`]
/// when `RedrawRequested` arrives and ticks the host only if one was due.
pub struct WindowSurface {
    window: Arc<Window>,
    next_frame: u64,
    pending: Option<FrameHandle>,
}

impl WindowSurface {
    pub fn new(window: Arc<Window>) -> Self {
        Self {
            window,
            next_frame: 1,
            pending: None,
        }
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    /// Claims the outstanding frame request, if any.
    pub fn take_due_frame(&mut self) -> Option<FrameHandle> {
        self.pending.take()
    }
}

impl Surface for WindowSurface {
    type Context = WgpuContext;

    fn layout_size(&self) -> LayoutSize {
        let scale_factor = self.window.scale_factor();
        let logical = self.window.inner_size().to_logical::<f64>(scale_factor);
        LayoutSize::new(logical.width, logical.height, scale_factor)
    }

    fn acquire_context(&mut self) -> Result<WgpuContext, HostError> {
        let size = self.layout_size().to_device();
        WgpuContext::new(Arc::clone(&self.window), size)
            .map_err(|err| HostError::ContextUnavailable(format!("{err:#}")))
    }

    fn request_frame(&mut self) -> FrameHandle {
        let handle = FrameHandle(self.next_frame);
        self.next_frame += 1;
        self.pending = Some(handle);
        self.window.request_redraw();
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        if self.pending == Some(handle) {
            self.pending = None;
        }
    }
}
