#![warn(missing_docs)]
//! # card-connect-overlay
//!
//! ## Purpose
//! Maps extraction bounding boxes from source-image pixels onto the scaled
//! preview the user sees.
//!
//! ## Responsibilities
//! - Scale box geometry by `displayed / natural`, per axis by default.
//! - Support uniform cover/contain fits for previews that crop or letterbox.
//! - Defer positioning while the natural size is unknown.
//!
//! ## Data flow
//! [`card_connect_core::BoundingBoxes`] + natural size + displayed size ->
//! [`OverlayMapper::map_all`] -> [`Annotation`] list rendered over the preview.
//!
//! ## Ownership and lifetimes
//! Mapping is pure; annotations own copies of their labels.
//!
//! ## Error model
//! Unknown sizes are not errors: they yield [`Placement::Pending`]. Only fit
//! mode parsing fails, with [`OverlayError`].

use std::str::FromStr;

use card_connect_core::{BoundingBox, BoundingBoxes, FieldKey, ImageSize};
use thiserror::Error;

/// How the preview image is fitted into its container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FitMode {
    /// Each axis scaled independently to fill the container.
    #[default]
    Fill,
    /// Uniform scale covering the container; overflow is cropped evenly.
    Cover,
    /// Uniform scale fitting inside the container; gaps are centered.
    Contain,
}

impl FromStr for FitMode {
    type Err = OverlayError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "fill" => Ok(Self::Fill),
            "cover" => Ok(Self::Cover),
            "contain" => Ok(Self::Contain),
            other => Err(OverlayError::UnknownFit(other.to_string())),
        }
    }
}

/// Rectangle in displayed-image coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayRect {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
}

/// Result of mapping one box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Placement {
    /// The box can be drawn at this rectangle.
    Positioned(DisplayRect),
    /// Sizes are not known yet; nothing should be drawn.
    Pending,
}

impl Placement {
    /// Returns the rectangle when positioned.
    pub fn rect(&self) -> Option<DisplayRect> {
        match self {
            Self::Positioned(rect) => Some(*rect),
            Self::Pending => None,
        }
    }
}

/// One overlay annotation keyed by field name.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    /// Field the annotation marks.
    pub key: FieldKey,
    /// Label drawn next to the rectangle.
    pub label: String,
    /// Where to draw it.
    pub placement: Placement,
}

/// Converts pixel-space boxes into display-space annotations.
#[derive(Debug, Clone, Copy, Default)]
pub struct OverlayMapper {
    fit: FitMode,
}

impl OverlayMapper {
    /// Creates a mapper for the given fit mode.
    pub fn new(fit: FitMode) -> Self {
        Self { fit }
    }

    /// Configured fit mode.
    pub fn fit(&self) -> FitMode {
        self.fit
    }

    /// Maps one box.
    ///
    /// Returns [`Placement::Pending`] when either size is unknown or the
    /// natural size has a non-positive dimension.
    pub fn map(
        &self,
        bounding_box: &BoundingBox,
        natural: Option<ImageSize>,
        displayed: Option<ImageSize>,
    ) -> Placement {
        let (Some(natural), Some(displayed)) = (natural, displayed) else {
            return Placement::Pending;
        };
        if !natural.is_positive() || !displayed.width.is_finite() || !displayed.height.is_finite()
        {
            return Placement::Pending;
        }

        let scale_x = displayed.width / natural.width;
        let scale_y = displayed.height / natural.height;

        let (scale_x, scale_y, offset_x, offset_y) = match self.fit {
            FitMode::Fill => (scale_x, scale_y, 0.0, 0.0),
            FitMode::Cover | FitMode::Contain => {
                let uniform = if self.fit == FitMode::Cover {
                    scale_x.max(scale_y)
                } else {
                    scale_x.min(scale_y)
                };
                // Centered: negative offsets for cropped overflow, positive
                // for letterbox gaps.
                let offset_x = (displayed.width - natural.width * uniform) / 2.0;
                let offset_y = (displayed.height - natural.height * uniform) / 2.0;
                (uniform, uniform, offset_x, offset_y)
            }
        };

        Placement::Positioned(DisplayRect {
            x: bounding_box.x * scale_x + offset_x,
            y: bounding_box.y * scale_y + offset_y,
            width: bounding_box.width * scale_x,
            height: bounding_box.height * scale_y,
        })
    }

    /// Maps every box in key order.
    pub fn map_all(
        &self,
        boxes: &BoundingBoxes,
        natural: Option<ImageSize>,
        displayed: Option<ImageSize>,
    ) -> Vec<Annotation> {
        boxes
            .values()
            .map(|bounding_box| Annotation {
                key: bounding_box.key.clone(),
                label: bounding_box.key.to_string(),
                placement: self.map(bounding_box, natural, displayed),
            })
            .collect()
    }
}

/// Maps one box with the per-axis [`FitMode::Fill`] contract.
pub fn map_box(
    bounding_box: &BoundingBox,
    natural: Option<ImageSize>,
    displayed: Option<ImageSize>,
) -> Placement {
    OverlayMapper::default().map(bounding_box, natural, displayed)
}

/// Error type for overlay configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OverlayError {
    /// Fit mode name is not one of `fill`, `cover`, `contain`.
    #[error("unknown fit mode: {0} (expected fill, cover or contain)")]
    UnknownFit(String),
}

#[cfg(test)]
mod tests {
    //! Unit tests for box mapping.

    use super::*;

    fn name_box() -> BoundingBox {
        BoundingBox {
            key: FieldKey::Name,
            x: 10.0,
            y: 20.0,
            width: 100.0,
            height: 20.0,
        }
    }

    #[test]
    fn fill_scales_axes_independently() {
        let placement = map_box(
            &name_box(),
            Some(ImageSize::new(1000.0, 500.0)),
            Some(ImageSize::new(500.0, 500.0)),
        );

        assert_eq!(
            placement,
            Placement::Positioned(DisplayRect {
                x: 5.0,
                y: 20.0,
                width: 50.0,
                height: 20.0,
            })
        );
    }

    #[test]
    fn unknown_natural_size_defers() {
        assert_eq!(
            map_box(&name_box(), None, Some(ImageSize::new(300.0, 200.0))),
            Placement::Pending
        );
        assert_eq!(
            map_box(
                &name_box(),
                Some(ImageSize::new(0.0, 200.0)),
                Some(ImageSize::new(300.0, 200.0))
            ),
            Placement::Pending
        );
    }

    #[test]
    fn cover_crops_overflow_evenly() {
        // 200x100 image in a 100x100 container: uniform scale 1.0, 50px
        // cropped from each side horizontally.
        let mapper = OverlayMapper::new(FitMode::Cover);
        let rect = mapper
            .map(
                &name_box(),
                Some(ImageSize::new(200.0, 100.0)),
                Some(ImageSize::new(100.0, 100.0)),
            )
            .rect()
            .expect("sizes are known");

        assert_eq!(rect.x, -40.0);
        assert_eq!(rect.y, 20.0);
        assert_eq!(rect.width, 100.0);
    }

    #[test]
    fn contain_letterboxes_vertically() {
        let mapper = OverlayMapper::new(FitMode::Contain);
        let rect = mapper
            .map(
                &name_box(),
                Some(ImageSize::new(200.0, 100.0)),
                Some(ImageSize::new(100.0, 100.0)),
            )
            .rect()
            .expect("sizes are known");

        assert_eq!(rect.x, 5.0);
        assert_eq!(rect.y, 35.0);
        assert_eq!(rect.height, 10.0);
    }

    #[test]
    fn fit_mode_parses_case_insensitively() {
        assert_eq!("Cover".parse::<FitMode>(), Ok(FitMode::Cover));
        assert!("stretch".parse::<FitMode>().is_err());
    }
}
