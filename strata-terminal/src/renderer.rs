/// Character-cell rendering of core samples
use crossterm::{
    style::{Color, Print, ResetColor, SetForegroundColor},
    QueueableCommand,
};
use std::io::Write;
use strata_core::{CoreSample, RockType, SegmentKind};

/// Width of the depth tick labels left of the column
const TICK_WIDTH: usize = 8;
/// Width of the core column itself
const COLUMN_WIDTH: usize = 6;
/// Depth label every this many rows
const TICK_EVERY: usize = 4;
/// Core radius used for the mass estimate, in meters
const CORE_RADIUS: f64 = 0.05;

/// Glyph used to fill a segment
pub fn glyph(kind: SegmentKind) -> char {
    match kind {
        SegmentKind::Rock(RockType::Soil) => '.',
        SegmentKind::Rock(RockType::Alluvium) => ':',
        SegmentKind::Rock(RockType::Sedimentary) => '=',
        SegmentKind::Rock(RockType::Metamorphic) => '%',
        SegmentKind::Rock(RockType::Igneous) => '#',
        SegmentKind::Rock(RockType::Bedrock) => '@',
        SegmentKind::Void => ' ',
    }
}

fn color(kind: SegmentKind) -> Color {
    match kind {
        SegmentKind::Rock(rock_type) => {
            let (r, g, b) = rock_type.display_color();
            Color::Rgb { r, g, b }
        }
        SegmentKind::Void => Color::DarkGrey,
    }
}

/// Draws a core sample as a vertical column with depth ticks and a legend
pub struct CoreColumnRenderer {
    width: usize,
    height: usize,
    char_buffer: Vec<char>,
    color_buffer: Vec<Color>,
}

impl CoreColumnRenderer {
    pub fn new(width: usize, height: usize) -> Self {
        let size = width * height;
        Self {
            width,
            height,
            char_buffer: vec![' '; size],
            color_buffer: vec![Color::Reset; size],
        }
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        if (width, height) != (self.width, self.height) {
            *self = Self::new(width, height);
        }
    }

    pub fn clear(&mut self) {
        self.char_buffer.fill(' ');
        self.color_buffer.fill(Color::Reset);
    }

    /// Rows 0 and the last row are left free for status lines
    pub fn render_sample(&mut self, sample: &CoreSample) {
        let rows = self.height.saturating_sub(2);
        if rows == 0 {
            return;
        }
        let depth = sample.penetrated_depth();
        let per_row = depth / rows as f64;

        for row in 0..rows {
            let y = row + 1;
            let top = sample.start_depth() + per_row * row as f64;
            if row % TICK_EVERY == 0 {
                self.put_str(0, y, &format!("{top:>6.1}m"), Color::Grey);
            }

            let mid = top + per_row / 2.0;
            let (fill, fill_color) = match sample.segment_at(mid) {
                Some(segment) => (glyph(segment.kind()), color(segment.kind())),
                None => (' ', Color::Reset),
            };
            self.put_char(TICK_WIDTH, y, '|', Color::Grey);
            for x in 0..COLUMN_WIDTH {
                self.put_char(TICK_WIDTH + 1 + x, y, fill, fill_color);
            }
            self.put_char(TICK_WIDTH + 1 + COLUMN_WIDTH, y, '|', Color::Grey);
        }

        self.render_legend(sample);
    }

    fn render_legend(&mut self, sample: &CoreSample) {
        let x = TICK_WIDTH + COLUMN_WIDTH + 4;
        let mut y = 1;

        for segment in sample.segments() {
            let kind = segment.kind();
            let label = segment.rock_type().map_or("void", RockType::label);
            let mut line = format!(
                "{} {:<11} {:>6.2} - {:>6.2} m",
                glyph(kind),
                label,
                segment.start_depth(),
                segment.end_depth()
            );
            if let Some(source) = segment.dominant_source() {
                line.push_str(&format!("  dip {:>4.1}°  {}", segment.dip_angle(), source.layer_name));
            }
            self.put_str(x, y, &line, color(kind));
            y += 1;
        }

        y += 1;
        for contact in sample.contacts() {
            let line = format!(
                "{:>6.2} m  {} / {}  {:?} ({:.0}°)",
                contact.depth,
                contact.upper.label(),
                contact.lower.label(),
                contact.contact_type,
                contact.angle
            );
            self.put_str(x, y, &line, Color::Grey);
            y += 1;
        }

        let summary = format!(
            "core {:.2} m, {:.1} kg",
            sample.penetrated_depth(),
            sample.estimated_mass(CORE_RADIUS)
        );
        self.put_str(x, y + 1, &summary, Color::White);
    }

    /// Centered one-line message, e.g. for an empty drill
    pub fn render_message(&mut self, text: &str) {
        let x = self.width.saturating_sub(text.chars().count()) / 2;
        let y = self.height / 2;
        self.put_str(x, y, text, Color::Yellow);
    }

    pub fn put_str(&mut self, x: usize, y: usize, text: &str, color: Color) {
        for (i, c) in text.chars().enumerate() {
            self.put_char(x + i, y, c, color);
        }
    }

    fn put_char(&mut self, x: usize, y: usize, c: char, color: Color) {
        if x < self.width && y < self.height {
            let idx = y * self.width + x;
            self.char_buffer[idx] = c;
            self.color_buffer[idx] = color;
        }
    }

    /// Text of one buffer row, trailing blanks trimmed
    pub fn row_text(&self, y: usize) -> String {
        if y >= self.height {
            return String::new();
        }
        let start = y * self.width;
        let row: String = self.char_buffer[start..start + self.width].iter().collect();
        row.trim_end().to_string()
    }

    pub fn draw<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        let mut current = Color::Reset;
        for y in 0..self.height {
            for x in 0..self.width {
                let idx = y * self.width + x;
                let color = self.color_buffer[idx];
                if color != current {
                    writer.queue(SetForegroundColor(color))?;
                    current = color;
                }
                writer.queue(Print(self.char_buffer[idx]))?;
            }
            if y + 1 < self.height {
                writer.queue(Print("\r\n"))?;
            }
        }
        writer.queue(ResetColor)?;
        Ok(())
    }
}
