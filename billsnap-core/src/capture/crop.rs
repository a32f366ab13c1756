//! Crop rectangle over a captured photo.
//!
//! All rectangle math happens in display units; the rectangle is only mapped
//! into source pixels when the crop is confirmed. Gestures are modelled as a
//! small per-drag state machine fed by generic pointer events, so any UI
//! toolkit can drive it.

use serde::{Deserialize, Serialize};
use std::io;
use tracing::{debug, error, info};

use crate::capture::services::{FileStore, ImageEditor};
use crate::error::CaptureError;
use crate::models::{ImageUri, PhotoDescriptor};

/// Smallest crop side, in display units.
pub const MIN_CROP_DIMENSION: f64 = 50.0;

/// Default crop side as a share of the shorter display dimension.
pub const DEFAULT_CROP_FRACTION: f64 = 0.8;

/// JPEG quality used when compressing the cropped image.
pub const CROP_COMPRESS_QUALITY: f32 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Size of the on-screen area the photo is shown in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplaySize {
    pub width: f64,
    pub height: f64,
}

impl DisplaySize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn shorter_side(&self) -> f64 {
        self.width.min(self.height)
    }
}

/// Crop rectangle in display coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl CropRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Square of `DEFAULT_CROP_FRACTION` of the shorter side, centered.
    ///
    /// Never smaller than `MIN_CROP_DIMENSION`, unless the display itself is.
    pub fn centered_default(display: DisplaySize) -> Self {
        let shorter = display.shorter_side();
        let size = (shorter * DEFAULT_CROP_FRACTION).max(MIN_CROP_DIMENSION.min(shorter));
        Self {
            x: (display.width - size) / 2.0,
            y: (display.height - size) / 2.0,
            width: size,
            height: size,
        }
    }

    pub fn fits_within(&self, display: DisplaySize) -> bool {
        self.x >= 0.0
            && self.y >= 0.0
            && self.right() <= display.width
            && self.bottom() <= display.height
    }
}

/// Crop rectangle in source image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Edge {
    Top,
    Bottom,
    Left,
    Right,
}

/// What a gesture is holding on to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DragHandle {
    /// The rectangle body
    Move,
    /// One of the four edge handles
    Edge(Edge),
}

/// Toolkit-independent pointer input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Press { handle: DragHandle, position: Point },
    Move { position: Point },
    Release,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum DragState {
    Idle,
    Dragging {
        handle: DragHandle,
        origin: Point,
        start: CropRect,
    },
}

/// Tracks the crop rectangle of the active capture session.
///
/// Only one handle can be dragged at a time; a second press while a gesture
/// is active is ignored until the pointer is released.
#[derive(Debug, Clone, PartialEq)]
pub struct CropRegion {
    display: DisplaySize,
    rect: CropRect,
    drag: DragState,
}

impl CropRegion {
    /// Region with the default centered rectangle for `display`.
    pub fn new(display: DisplaySize) -> Self {
        Self {
            display,
            rect: CropRect::centered_default(display),
            drag: DragState::Idle,
        }
    }

    /// Region around a rectangle chosen elsewhere (e.g. by a UI shell).
    ///
    /// # Returns
    ///
    /// Returns `None` unless `rect` lies inside `display` with each side at
    /// least `MIN_CROP_DIMENSION` (or the full display dimension).
    pub fn with_rect(display: DisplaySize, rect: CropRect) -> Option<Self> {
        let min_width = MIN_CROP_DIMENSION.min(display.width);
        let min_height = MIN_CROP_DIMENSION.min(display.height);
        if !rect.fits_within(display) || rect.width < min_width || rect.height < min_height {
            return None;
        }
        Some(Self {
            display,
            rect,
            drag: DragState::Idle,
        })
    }

    pub fn rect(&self) -> CropRect {
        self.rect
    }

    pub fn display(&self) -> DisplaySize {
        self.display
    }

    pub fn active_handle(&self) -> Option<DragHandle> {
        match self.drag {
            DragState::Idle => None,
            DragState::Dragging { handle, .. } => Some(handle),
        }
    }

    /// Feeds one pointer event into the drag state machine.
    ///
    /// # Returns
    ///
    /// Returns `true` if the event was accepted.
    pub fn handle_pointer(&mut self, event: PointerEvent) -> bool {
        match event {
            PointerEvent::Press { handle: DragHandle::Move, position } => self.begin_move(position),
            PointerEvent::Press { handle: DragHandle::Edge(edge), position } => {
                self.begin_resize(edge, position)
            }
            PointerEvent::Move { position } => match self.active_handle() {
                Some(DragHandle::Move) => self.continue_move(position),
                Some(DragHandle::Edge(edge)) => self.continue_resize(edge, position),
                None => false,
            },
            PointerEvent::Release => {
                let was_dragging = self.active_handle().is_some();
                self.release();
                was_dragging
            }
        }
    }

    pub fn begin_move(&mut self, pointer: Point) -> bool {
        self.begin(DragHandle::Move, pointer)
    }

    /// Translates the rectangle by the pointer delta since `begin_move`,
    /// keeping it fully on screen.
    pub fn continue_move(&mut self, pointer: Point) -> bool {
        let DragState::Dragging { handle: DragHandle::Move, origin, start } = self.drag else {
            return false;
        };

        let dx = pointer.x - origin.x;
        let dy = pointer.y - origin.y;
        let max_x = (self.display.width - start.width).max(0.0);
        let max_y = (self.display.height - start.height).max(0.0);

        self.rect.x = (start.x + dx).max(0.0).min(max_x);
        self.rect.y = (start.y + dy).max(0.0).min(max_y);
        true
    }

    pub fn begin_resize(&mut self, edge: Edge, pointer: Point) -> bool {
        self.begin(DragHandle::Edge(edge), pointer)
    }

    /// Moves `edge` by the pointer delta since `begin_resize`.
    ///
    /// The opposite edge stays put. Each side is kept at least
    /// `MIN_CROP_DIMENSION` long and the dragged side never leaves the
    /// display. Ignored unless `edge` is the handle currently held.
    pub fn continue_resize(&mut self, edge: Edge, pointer: Point) -> bool {
        let DragState::Dragging {
            handle: DragHandle::Edge(active),
            origin,
            start,
        } = self.drag
        else {
            return false;
        };
        if active != edge {
            return false;
        }

        let min_width = MIN_CROP_DIMENSION.min(self.display.width);
        let min_height = MIN_CROP_DIMENSION.min(self.display.height);
        let dx = pointer.x - origin.x;
        let dy = pointer.y - origin.y;

        match edge {
            Edge::Top => {
                let (y, height) =
                    drag_leading(start.y, start.height, dy, min_height, self.display.height);
                self.rect.y = y;
                self.rect.height = height;
            }
            Edge::Bottom => {
                self.rect.height =
                    drag_trailing(start.y, start.height, dy, min_height, self.display.height);
            }
            Edge::Left => {
                let (x, width) =
                    drag_leading(start.x, start.width, dx, min_width, self.display.width);
                self.rect.x = x;
                self.rect.width = width;
            }
            Edge::Right => {
                self.rect.width =
                    drag_trailing(start.x, start.width, dx, min_width, self.display.width);
            }
        }
        true
    }

    /// Ends the current gesture, if any.
    pub fn release(&mut self) {
        self.drag = DragState::Idle;
    }

    fn begin(&mut self, handle: DragHandle, pointer: Point) -> bool {
        if let DragState::Dragging { handle: active, .. } = self.drag {
            debug!("Ignoring {:?} press, {:?} already active", handle, active);
            return false;
        }
        self.drag = DragState::Dragging {
            handle,
            origin: pointer,
            start: self.rect,
        };
        true
    }

    /// Maps the display rectangle into pixels of `photo`.
    ///
    /// Each axis is scaled by `photo dimension / display dimension`, then
    /// rounded to the nearest pixel (halves away from zero) and clamped to the
    /// photo. Width and height are at least one pixel.
    ///
    /// # Returns
    ///
    /// Returns `None` if the photo or display has a zero dimension.
    pub fn to_pixel_rect(&self, photo: &PhotoDescriptor) -> Option<PixelRect> {
        if photo.width == 0
            || photo.height == 0
            || self.display.width <= 0.0
            || self.display.height <= 0.0
        {
            return None;
        }

        let ratio_x = f64::from(photo.width) / self.display.width;
        let ratio_y = f64::from(photo.height) / self.display.height;
        let (x, width) = scale_axis(self.rect.x, self.rect.width, ratio_x, photo.width);
        let (y, height) = scale_axis(self.rect.y, self.rect.height, ratio_y, photo.height);

        Some(PixelRect { x, y, width, height })
    }

    /// Crops `photo` to the current rectangle and moves the result into
    /// durable storage.
    ///
    /// The compressed crop lands in volatile storage first and is released
    /// once the durable copy exists (or the copy failed). The region itself is
    /// left untouched, so a failed confirm can simply be retried.
    ///
    /// # Errors
    ///
    /// Returns `CaptureError::Crop` if cropping fails and
    /// `CaptureError::Persist` if the durable copy fails.
    pub async fn confirm(
        &self,
        photo: &PhotoDescriptor,
        editor: &dyn ImageEditor,
        files: &dyn FileStore,
    ) -> Result<ImageUri, CaptureError> {
        let pixels = self.to_pixel_rect(photo).ok_or_else(|| {
            CaptureError::Crop(io::Error::new(
                io::ErrorKind::InvalidInput,
                "photo or display has no area",
            ))
        })?;

        info!(
            "Cropping {} to {}x{} at ({}, {})",
            photo.uri, pixels.width, pixels.height, pixels.x, pixels.y
        );

        let cropped = editor
            .crop_and_compress(&photo.uri, pixels, CROP_COMPRESS_QUALITY)
            .await
            .map_err(|e| {
                error!("Crop of {} failed: {}", photo.uri, e);
                CaptureError::Crop(e)
            })?;

        let persisted = files.persist(&cropped).await;
        files.release(&cropped).await;

        match persisted {
            Ok(durable) => {
                info!("Cropped bill image stored at {}", durable);
                Ok(durable)
            }
            Err(e) => {
                error!("Failed to copy {} to durable storage: {}", cropped, e);
                Err(CaptureError::Persist(e))
            }
        }
    }
}

/// Drag of the top or left edge: the far edge stays fixed.
fn drag_leading(start: f64, length: f64, delta: f64, min_length: f64, limit: f64) -> (f64, f64) {
    let mut origin = start + delta;
    let mut length = length - delta;

    if origin < 0.0 {
        length -= -origin;
        origin = 0.0;
    }
    if length < min_length {
        origin -= min_length - length;
        length = min_length;
    }
    if origin + length > limit {
        length = limit - origin;
    }

    (origin, length)
}

/// Drag of the bottom or right edge: the origin stays fixed.
fn drag_trailing(origin: f64, length: f64, delta: f64, min_length: f64, limit: f64) -> f64 {
    let mut length = (length + delta).max(min_length);
    if origin + length > limit {
        length = limit - origin;
    }
    length
}

fn scale_axis(origin: f64, length: f64, ratio: f64, pixels: u32) -> (u32, u32) {
    let max_origin = f64::from(pixels - 1);
    let origin_px = (origin * ratio).round().max(0.0).min(max_origin);
    let length_px = (length * ratio)
        .round()
        .max(1.0)
        .min(f64::from(pixels) - origin_px);

    (origin_px as u32, length_px as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phone() -> DisplaySize {
        DisplaySize::new(400.0, 600.0)
    }

    fn assert_inside(region: &CropRegion) {
        let rect = region.rect();
        let display = region.display();
        assert!(rect.fits_within(display), "{rect:?} escaped {display:?}");
        assert!(rect.width >= MIN_CROP_DIMENSION, "{rect:?} too narrow");
        assert!(rect.height >= MIN_CROP_DIMENSION, "{rect:?} too short");
    }

    /// Deterministic spread of pointer positions, including far off-screen ones.
    fn pointer_walk() -> Vec<Point> {
        let mut points = Vec::new();
        let mut seed: u64 = 0x2545_f491;
        for _ in 0..400 {
            seed = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
            let x = ((seed >> 33) % 1600) as f64 - 600.0;
            let y = ((seed >> 17) % 2000) as f64 - 700.0;
            points.push(Point::new(x, y));
        }
        points
    }

    #[test]
    fn test_default_rect_is_centered_on_shorter_side() {
        let region = CropRegion::new(phone());
        assert_eq!(region.rect(), CropRect::new(40.0, 140.0, 320.0, 320.0));

        let landscape = CropRegion::new(DisplaySize::new(800.0, 500.0));
        assert_eq!(landscape.rect(), CropRect::new(200.0, 50.0, 400.0, 400.0));
    }

    #[test]
    fn test_with_rect_rejects_small_or_escaping_rects() {
        let inside = CropRect::new(10.0, 10.0, 100.0, 80.0);
        assert_eq!(CropRegion::with_rect(phone(), inside).map(|r| r.rect()), Some(inside));

        assert!(CropRegion::with_rect(phone(), CropRect::new(10.0, 10.0, 40.0, 80.0)).is_none());
        assert!(CropRegion::with_rect(phone(), CropRect::new(350.0, 10.0, 100.0, 80.0)).is_none());
        assert!(CropRegion::with_rect(phone(), CropRect::new(-1.0, 10.0, 100.0, 80.0)).is_none());
    }

    #[test]
    fn test_default_rect_on_narrow_display_keeps_minimum() {
        let narrow = CropRegion::new(DisplaySize::new(60.0, 600.0));
        assert_eq!(narrow.rect(), CropRect::new(5.0, 275.0, 50.0, 50.0));
        assert_inside(&narrow);

        let tiny = CropRegion::new(DisplaySize::new(30.0, 40.0));
        assert_eq!(tiny.rect(), CropRect::new(0.0, 5.0, 30.0, 30.0));
        assert!(tiny.rect().fits_within(tiny.display()));
    }

    #[test]
    fn test_move_stays_within_display() {
        let mut region = CropRegion::new(phone());
        for target in pointer_walk() {
            assert!(region.begin_move(Point::new(200.0, 300.0)));
            assert!(region.continue_move(target));
            let rect = region.rect();
            assert!(rect.x >= 0.0 && rect.x <= 400.0 - rect.width);
            assert!(rect.y >= 0.0 && rect.y <= 600.0 - rect.height);
            region.release();
        }
    }

    #[test]
    fn test_move_clamps_to_corner() {
        let mut region = CropRegion::new(phone());
        region.begin_move(Point::new(0.0, 0.0));
        region.continue_move(Point::new(-1000.0, 5000.0));
        assert_eq!(region.rect(), CropRect::new(0.0, 280.0, 320.0, 320.0));
    }

    #[test]
    fn test_resize_sequences_keep_minimum_and_bounds() {
        let mut region = CropRegion::new(phone());
        let edges = [Edge::Top, Edge::Right, Edge::Bottom, Edge::Left];
        for (i, target) in pointer_walk().into_iter().enumerate() {
            let edge = edges[i % edges.len()];
            let rect = region.rect();
            let grab = match edge {
                Edge::Top => Point::new(rect.x + rect.width / 2.0, rect.y),
                Edge::Bottom => Point::new(rect.x + rect.width / 2.0, rect.bottom()),
                Edge::Left => Point::new(rect.x, rect.y + rect.height / 2.0),
                Edge::Right => Point::new(rect.right(), rect.y + rect.height / 2.0),
            };
            assert!(region.begin_resize(edge, grab));
            assert!(region.continue_resize(edge, target));
            assert_inside(&region);
            region.release();
        }
    }

    #[test]
    fn test_top_resize_keeps_bottom_fixed() {
        let mut region = CropRegion::new(phone());
        let bottom = region.rect().bottom();

        region.begin_resize(Edge::Top, Point::new(200.0, 140.0));
        region.continue_resize(Edge::Top, Point::new(200.0, -500.0));
        assert_eq!(region.rect().y, 0.0);
        assert_eq!(region.rect().bottom(), bottom);

        region.continue_resize(Edge::Top, Point::new(200.0, 2000.0));
        assert_eq!(region.rect().height, MIN_CROP_DIMENSION);
        assert_eq!(region.rect().bottom(), bottom);
    }

    #[test]
    fn test_right_resize_clamps_to_display() {
        let mut region = CropRegion::new(phone());
        region.begin_resize(Edge::Right, Point::new(360.0, 300.0));
        region.continue_resize(Edge::Right, Point::new(900.0, 300.0));
        assert_eq!(region.rect().right(), 400.0);
        assert_eq!(region.rect().x, 40.0);
    }

    #[test]
    fn test_only_one_handle_per_gesture() {
        let mut region = CropRegion::new(phone());
        assert!(region.handle_pointer(PointerEvent::Press {
            handle: DragHandle::Edge(Edge::Left),
            position: Point::new(40.0, 300.0),
        }));
        assert!(!region.handle_pointer(PointerEvent::Press {
            handle: DragHandle::Move,
            position: Point::new(200.0, 300.0),
        }));
        assert!(!region.continue_resize(Edge::Right, Point::new(500.0, 300.0)));
        assert_eq!(region.active_handle(), Some(DragHandle::Edge(Edge::Left)));

        assert!(region.handle_pointer(PointerEvent::Move { position: Point::new(60.0, 300.0) }));
        assert_eq!(region.rect().x, 60.0);
        assert_eq!(region.rect().width, 300.0);

        assert!(region.handle_pointer(PointerEvent::Release));
        assert!(!region.handle_pointer(PointerEvent::Move { position: Point::new(0.0, 0.0) }));
    }

    #[test]
    fn test_pixel_mapping_scales_each_axis() {
        let mut region = CropRegion::new(phone());
        region.rect = CropRect::new(40.0, 50.0, 320.0, 320.0);
        let photo = PhotoDescriptor {
            uri: ImageUri::new("file:///cache/photo.jpg"),
            width: 3000,
            height: 4000,
        };

        let pixels = region.to_pixel_rect(&photo).expect("mapping");
        assert_eq!(pixels, PixelRect::new(300, 333, 2400, 2133));
    }

    #[test]
    fn test_pixel_mapping_never_exceeds_photo() {
        let mut region = CropRegion::new(DisplaySize::new(3.0, 3.0));
        region.rect = CropRect::new(0.0, 0.0, 3.0, 3.0);
        let photo = PhotoDescriptor {
            uri: ImageUri::new("file:///cache/tiny.jpg"),
            width: 2,
            height: 2,
        };
        assert_eq!(region.to_pixel_rect(&photo), Some(PixelRect::new(0, 0, 2, 2)));

        let empty = PhotoDescriptor { width: 0, ..photo };
        assert!(region.to_pixel_rect(&empty).is_none());
    }
}
