/*!
# Plot Coordinate Mapping

Maps device (pixel) points to the association plot's domain (genomic position on
the x axis, display score on the y axis) and back. Device y grows downward while
score grows upward, so the y axis is flipped inside the plot area.
*/

use serde::{Deserialize, Serialize};

use crate::error::{AssocError, AssocResult};
use crate::types::ChromosomeResultSet;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DevicePoint {
    pub x: f64,
    pub y: f64,
}

impl DevicePoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DomainPoint {
    pub position: f64,
    pub score: f64,
}

/// Converts device points to domain points; implemented by whatever owns the plot
pub trait CoordinateMapper: Send + Sync {
    fn to_domain(&self, point: DevicePoint) -> DomainPoint;
}

/// Rectangle of the surface (in device units) where data is drawn
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlotArea {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl PlotArea {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self { left, top, width, height }
    }

    /// Area inside a `width` x `height` surface after subtracting margins
    pub fn with_margins(width: f64, height: f64, left: f64, right: f64, top: f64, bottom: f64) -> Self {
        Self {
            left,
            top,
            width: width - left - right,
            height: height - top - bottom,
        }
    }

    pub fn contains(&self, point: DevicePoint) -> bool {
        point.x >= self.left
            && point.x <= self.left + self.width
            && point.y >= self.top
            && point.y <= self.top + self.height
    }
}

/// Domain ranges visible in the plot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DomainRect {
    pub position_min: f64,
    pub position_max: f64,
    pub score_min: f64,
    pub score_max: f64,
}

/// Current viewport transform of an association plot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlotViewport {
    domain: DomainRect,
    area: PlotArea,
}

impl PlotViewport {
    pub fn new(domain: DomainRect, area: PlotArea) -> AssocResult<Self> {
        let spans = [
            ("position", domain.position_max - domain.position_min),
            ("score", domain.score_max - domain.score_min),
        ];
        for (axis, span) in spans {
            if !(span.is_finite() && span > 0.0) {
                return Err(AssocError::invalid_viewport(format!(
                    "{} range must be finite and non-empty, got span {}",
                    axis, span
                )));
            }
        }
        if !(area.width > 0.0 && area.height > 0.0) {
            return Err(AssocError::invalid_viewport(format!(
                "plot area must be positive, got {}x{}",
                area.width, area.height
            )));
        }
        Ok(Self { domain, area })
    }

    /// Fit a viewport around `results`: the x axis spans the set's extent and the y
    /// axis runs from zero to the peak score plus `headroom` (a fraction of the peak).
    pub fn for_result_set(results: &ChromosomeResultSet, area: PlotArea, headroom: f64) -> AssocResult<Self> {
        let (start, end) = results.extent().unwrap_or((0, 1));
        let position_max = if end > start { end as f64 } else { start as f64 + 1.0 };
        let peak = results.peak().map_or(0.0, |iv| iv.display_score()).max(0.0);
        let score_max = if peak > 0.0 { peak * (1.0 + headroom.max(0.0)) } else { 1.0 };

        Self::new(
            DomainRect {
                position_min: start as f64,
                position_max,
                score_min: 0.0,
                score_max,
            },
            area,
        )
    }

    pub fn domain(&self) -> &DomainRect {
        &self.domain
    }

    pub fn area(&self) -> &PlotArea {
        &self.area
    }

    pub fn device_to_domain(&self, point: DevicePoint) -> DomainPoint {
        let fx = (point.x - self.area.left) / self.area.width;
        let fy = (point.y - self.area.top) / self.area.height;
        DomainPoint {
            position: self.domain.position_min + fx * (self.domain.position_max - self.domain.position_min),
            score: self.domain.score_max - fy * (self.domain.score_max - self.domain.score_min),
        }
    }

    pub fn domain_to_device(&self, point: DomainPoint) -> DevicePoint {
        let fx = (point.position - self.domain.position_min) / (self.domain.position_max - self.domain.position_min);
        let fy = (self.domain.score_max - point.score) / (self.domain.score_max - self.domain.score_min);
        DevicePoint {
            x: self.area.left + fx * self.area.width,
            y: self.area.top + fy * self.area.height,
        }
    }
}

impl CoordinateMapper for PlotViewport {
    fn to_domain(&self, point: DevicePoint) -> DomainPoint {
        self.device_to_domain(point)
    }
}
