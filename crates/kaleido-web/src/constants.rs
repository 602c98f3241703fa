// Web front-end constants (DOM, media and GPU plumbing).
// Visual and audio tuning lives in kaleido_core::constants.

// Canvas backing store
pub const MAX_DEVICE_PIXEL_RATIO: f64 = 2.0; // higher ratios render at 2x
pub const MIN_BACKING_PX: u32 = 2;

// Element classes so the shell can style the two stacked canvases
pub const CANVAS_2D_CLASS: &str = "kaleido-2d";
pub const CANVAS_GPU_CLASS: &str = "kaleido-gpu";

// Capture
pub const CAPTURE_MIME: &str = "image/png";

// Media
pub const CAMERA_FACING_MODE: &str = "user";
pub const HAVE_CURRENT_DATA: u16 = 2; // HTMLMediaElement.readyState with a decodable frame
pub const CROSS_ORIGIN: &str = "anonymous";

// DOMException names mapped to permission errors
pub const PERMISSION_ERRORS: [&str; 2] = ["NotAllowedError", "SecurityError"];
pub const MOTION_PERMISSION_GRANTED: &str = "granted";

// GPU
pub const MIRROR_TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
pub const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.039,
    g: 0.043,
    b: 0.063,
    a: 1.0,
};
