//! The widget tree as seen by its toplevel window.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use toplevel_core::geometry::Rect;

/// Whatever a window displays.
///
/// The window only needs to know how big its content wants to be and where to put it. Methods
/// are called while the window is borrowed and must not call back into it.
pub trait Content: fmt::Debug {
    /// Minimum and natural width.
    fn preferred_width(&self) -> (i32, i32);

    /// Minimum and natural height when given `width`.
    fn preferred_height_for_width(&self, width: i32) -> (i32, i32);

    /// The minimum size of the whole content while its geometry widget is forced to
    /// `probe × probe`.
    ///
    /// Returns `None` when there is no separate geometry widget, in which case geometry hints
    /// apply to the content as a whole.
    fn probe_geometry_widget(&mut self, probe: i32) -> Option<(i32, i32)> {
        let _ = probe;
        None
    }

    /// Lay the content out in `allocation`. The origin is always `(0, 0)`.
    fn allocate(&mut self, allocation: Rect);

    /// Minimum width and the minimum height for that width.
    fn minimum_size(&self) -> (i32, i32) {
        let (min_width, _) = self.preferred_width();
        let (min_height, _) = self.preferred_height_for_width(min_width);
        (min_width, min_height)
    }
}

/// Content with a fixed minimum and natural size.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixedContent {
    minimum: (i32, i32),
    natural: (i32, i32),
    /// Border around an embedded geometry widget, if there is one.
    geometry_border: Option<(i32, i32)>,
    allocation: Option<Rect>,
}

impl FixedContent {
    /// Content whose minimum and natural sizes are both `width × height`.
    pub fn new(width: i32, height: i32) -> Self {
        Self::with_natural((width, height), (width, height))
    }

    pub fn with_natural(minimum: (i32, i32), natural: (i32, i32)) -> Self {
        FixedContent { minimum, natural, geometry_border: None, allocation: None }
    }

    /// Designate an embedded geometry widget surrounded by a fixed border.
    pub fn with_geometry_widget(mut self, border_width: i32, border_height: i32) -> Self {
        self.geometry_border = Some((border_width, border_height));
        self
    }

    pub fn set_size(&mut self, minimum: (i32, i32), natural: (i32, i32)) {
        self.minimum = minimum;
        self.natural = natural;
    }

    /// The last allocation handed to this content.
    pub fn allocation(&self) -> Option<Rect> {
        self.allocation
    }
}

impl Content for FixedContent {
    fn preferred_width(&self) -> (i32, i32) {
        (self.minimum.0, self.natural.0)
    }

    fn preferred_height_for_width(&self, _width: i32) -> (i32, i32) {
        (self.minimum.1, self.natural.1)
    }

    fn probe_geometry_widget(&mut self, probe: i32) -> Option<(i32, i32)> {
        self.geometry_border.map(|(width, height)| (probe + width, probe + height))
    }

    fn allocate(&mut self, allocation: Rect) {
        self.allocation = Some(allocation);
    }
}

impl<C: Content + ?Sized> Content for Box<C> {
    fn preferred_width(&self) -> (i32, i32) {
        (**self).preferred_width()
    }

    fn preferred_height_for_width(&self, width: i32) -> (i32, i32) {
        (**self).preferred_height_for_width(width)
    }

    fn probe_geometry_widget(&mut self, probe: i32) -> Option<(i32, i32)> {
        (**self).probe_geometry_widget(probe)
    }

    fn allocate(&mut self, allocation: Rect) {
        (**self).allocate(allocation)
    }
}

/// Shared content, for applications that keep a handle to what the window displays.
impl<C: Content + ?Sized> Content for Rc<RefCell<C>> {
    fn preferred_width(&self) -> (i32, i32) {
        self.borrow().preferred_width()
    }

    fn preferred_height_for_width(&self, width: i32) -> (i32, i32) {
        self.borrow().preferred_height_for_width(width)
    }

    fn probe_geometry_widget(&mut self, probe: i32) -> Option<(i32, i32)> {
        self.borrow_mut().probe_geometry_widget(probe)
    }

    fn allocate(&mut self, allocation: Rect) {
        self.borrow_mut().allocate(allocation)
    }
}
