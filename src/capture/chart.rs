use std::io::Cursor;

use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use plotters::prelude::*;

use crate::capture::buffer::{ChannelBuffer, ChannelSet, CHANNEL_COUNT};
use crate::capture::error::CaptureError;

/// Fixed series colors, SMA1 first: blue, green, orange, red.
const PALETTE: [RGBColor; CHANNEL_COUNT] = [
    RGBColor(0, 128, 255),
    RGBColor(0, 204, 0),
    RGBColor(255, 153, 0),
    RGBColor(255, 0, 0),
];

#[derive(Clone, Debug)]
pub struct ChartStyle {
    pub width: u32,
    pub height: u32,
    pub margin: u32,
    pub background: RGBColor,
    pub palette: [RGBColor; CHANNEL_COUNT],
    /// Minimum vertical range in nanoseconds; a flat series is still drawn
    /// against a finite scale.
    pub range_floor_ns: f64,
}

impl Default for ChartStyle {
    fn default() -> Self {
        Self {
            width: 900,
            height: 400,
            margin: 10,
            background: WHITE,
            palette: PALETTE,
            range_floor_ns: 10.0,
        }
    }
}

impl ChartStyle {
    fn series_color(&self, wire: usize) -> RGBColor {
        self.palette[(wire.saturating_sub(1)) % self.palette.len()]
    }
}

fn y_bounds(min_ns: i64, max_ns: i64, floor: f64) -> (f64, f64) {
    let range = ((max_ns - min_ns) as f64).max(floor);
    (min_ns as f64, min_ns as f64 + range)
}

/// Renders one channel's retained samples into PNG bytes.
///
/// Stateless: every call recomputes the scale from the buffer's lifetime
/// extrema and plots the retained window oldest to newest, evenly spaced.
/// Fewer than two samples produce an empty chart frame.
pub fn render_channel_png(
    buffer: &ChannelBuffer,
    wire: usize,
    style: &ChartStyle,
) -> Result<Vec<u8>, CaptureError> {
    let mut raw = vec![0u8; (style.width * style.height * 3) as usize];
    {
        let root =
            BitMapBackend::with_buffer(&mut raw, (style.width, style.height)).into_drawing_area();
        root.fill(&style.background)?;
        if let (Some(min_ns), Some(max_ns), true) =
            (buffer.min_ns(), buffer.max_ns(), buffer.count() >= 2)
        {
            let caption = match buffer.latest() {
                Some(sample) => format!("{}: {} ns", ChannelSet::label(wire), sample.value_ns),
                None => format!("{}: -- ns", ChannelSet::label(wire)),
            };
            let (y_min, y_max) = y_bounds(min_ns, max_ns, style.range_floor_ns);
            let x_max = (buffer.count() - 1) as f64;
            let mut chart = ChartBuilder::on(&root)
                .margin(style.margin)
                .caption(caption, ("sans-serif", 16).into_font())
                .set_label_area_size(LabelAreaPosition::Left, 45)
                .set_label_area_size(LabelAreaPosition::Bottom, 25)
                .build_cartesian_2d(0f64..x_max, y_min..y_max)?;
            chart
                .configure_mesh()
                .light_line_style(&BLACK.mix(0.1))
                .draw()?;
            let color = style.series_color(wire);
            let series = buffer
                .iter_chronological()
                .enumerate()
                .map(|(i, s)| (i as f64, s.value_ns as f64));
            chart.draw_series(LineSeries::new(series, &color))?;
        }
        root.present()?;
    }
    encode_png(&raw, style.width, style.height)
}

/// Renders all channels into one shared coordinate frame.
///
/// The vertical scale comes from the global lifetime extrema across every
/// channel and the horizontal extent from the longest retained count, so
/// the series stay comparable.
pub fn render_overlay_png(
    channels: &ChannelSet,
    style: &ChartStyle,
) -> Result<Vec<u8>, CaptureError> {
    let mut global: Option<(i64, i64)> = None;
    let mut longest = 0usize;
    for buffer in channels.iter() {
        if let (Some(min_ns), Some(max_ns)) = (buffer.min_ns(), buffer.max_ns()) {
            global = Some(match global {
                None => (min_ns, max_ns),
                Some((g_min, g_max)) => (g_min.min(min_ns), g_max.max(max_ns)),
            });
            longest = longest.max(buffer.count());
        }
    }

    let mut raw = vec![0u8; (style.width * style.height * 3) as usize];
    {
        let root =
            BitMapBackend::with_buffer(&mut raw, (style.width, style.height)).into_drawing_area();
        root.fill(&style.background)?;
        if let (Some((g_min, g_max)), true) = (global, longest >= 2) {
            let (y_min, y_max) = y_bounds(g_min, g_max, style.range_floor_ns);
            let x_max = (longest - 1) as f64;
            let mut chart = ChartBuilder::on(&root)
                .margin(style.margin)
                .caption("All channels - TIE measurements", ("sans-serif", 18).into_font())
                .set_label_area_size(LabelAreaPosition::Left, 45)
                .set_label_area_size(LabelAreaPosition::Bottom, 25)
                .build_cartesian_2d(0f64..x_max, y_min..y_max)?;
            chart
                .configure_mesh()
                .light_line_style(&BLACK.mix(0.1))
                .draw()?;
            for (index, buffer) in channels.iter().enumerate() {
                if buffer.count() < 2 {
                    continue;
                }
                let wire = index + 1;
                let color = style.series_color(wire);
                let series = buffer
                    .iter_chronological()
                    .enumerate()
                    .map(|(i, s)| (i as f64, s.value_ns as f64));
                chart
                    .draw_series(LineSeries::new(series, &color))?
                    .label(ChannelSet::label(wire))
                    .legend(move |(x, y)| {
                        PathElement::new(vec![(x, y), (x + 20, y)], &color)
                    });
            }
            chart
                .configure_series_labels()
                .border_style(&BLACK.mix(0.2))
                .background_style(&style.background.mix(0.8))
                .draw()?;
        }
        root.present()?;
    }
    encode_png(&raw, style.width, style.height)
}

fn encode_png(raw: &[u8], width: u32, height: u32) -> Result<Vec<u8>, CaptureError> {
    let image = ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, raw.to_vec())
        .ok_or_else(|| CaptureError::Chart("failed to allocate image buffer".into()))?;
    let mut output = Vec::new();
    let dynamic = DynamicImage::ImageRgb8(image);
    dynamic.write_to(&mut Cursor::new(&mut output), ImageFormat::Png)?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::buffer::Sample;

    const PNG_MAGIC: [u8; 4] = [0x89, b'P', b'N', b'G'];

    fn filled(values: &[i64]) -> ChannelBuffer {
        let mut buffer = ChannelBuffer::new(100);
        for (i, v) in values.iter().enumerate() {
            buffer.push(Sample::new(*v, i as i64));
        }
        buffer
    }

    #[test]
    fn renders_single_channel_chart() {
        let buffer = filled(&[100, -50, 75, 0]);
        let png = render_channel_png(&buffer, 1, &ChartStyle::default()).unwrap();
        assert_eq!(&png[..4], &PNG_MAGIC);
    }

    #[test]
    fn flat_series_gets_clamped_scale() {
        // Lifetime min equals max; the floor keeps the scale finite.
        let buffer = filled(&[42, 42, 42]);
        let png = render_channel_png(&buffer, 2, &ChartStyle::default()).unwrap();
        assert_eq!(&png[..4], &PNG_MAGIC);
    }

    #[test]
    fn empty_buffer_renders_blank_frame() {
        let buffer = ChannelBuffer::new(10);
        let png = render_channel_png(&buffer, 3, &ChartStyle::default()).unwrap();
        assert_eq!(&png[..4], &PNG_MAGIC);
    }

    #[test]
    fn overlay_handles_unevenly_filled_channels() {
        let mut channels = ChannelSet::new(100);
        for v in [10, 20, 30, 40] {
            channels.get_mut(1).unwrap().push(Sample::new(v, 0));
        }
        for v in [-5, 5] {
            channels.get_mut(3).unwrap().push(Sample::new(v, 0));
        }
        // SMA2 has a single sample and is skipped, SMA4 is empty.
        channels.get_mut(2).unwrap().push(Sample::new(7, 0));
        let png = render_overlay_png(&channels, &ChartStyle::default()).unwrap();
        assert_eq!(&png[..4], &PNG_MAGIC);
    }

    #[test]
    fn overlay_of_empty_set_renders_blank_frame() {
        let channels = ChannelSet::new(10);
        let png = render_overlay_png(&channels, &ChartStyle::default()).unwrap();
        assert_eq!(&png[..4], &PNG_MAGIC);
    }

    #[test]
    fn y_bounds_clamp_degenerate_range() {
        let (lo, hi) = y_bounds(5, 5, 10.0);
        assert_eq!(lo, 5.0);
        assert_eq!(hi, 15.0);
        let (lo, hi) = y_bounds(-100, 100, 10.0);
        assert_eq!(lo, -100.0);
        assert_eq!(hi, 100.0);
    }
}
