use crate::error::BookdexError;
use crate::source::{BBox, PageSource, TextMode};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Page source backed by the poppler command-line tools.
///
/// Every call shells out to `pdftotext` (or `pdfinfo` for the page count)
/// scoped to a single page, so the document is opened and released within
/// each operation.
pub struct PdftotextSource {
    path: PathBuf,
}

impl PdftotextSource {
    pub fn open(path: impl Into<PathBuf>) -> Result<PdftotextSource, BookdexError> {
        let path = path.into();
        if !path.is_file() {
            return Err(BookdexError::Source(format!(
                "no such file: {}",
                path.display()
            )));
        }
        Ok(PdftotextSource { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if pdftotext is available on the system.
    pub fn is_available() -> bool {
        Command::new("pdftotext")
            .arg("-v")
            .output()
            .map(|o| o.status.success() || !o.stderr.is_empty())
            .unwrap_or(false)
    }

    fn bbox_lines(&self, page: usize) -> Result<Vec<BBoxLine>, BookdexError> {
        let output = run_poppler(
            Command::new("pdftotext")
                .arg("-f")
                .arg(page.to_string())
                .arg("-l")
                .arg(page.to_string())
                .arg("-bbox-layout")
                .arg(&self.path)
                .arg("-"),
        )?;
        Ok(parse_bbox_xml(&output))
    }
}

impl PageSource for PdftotextSource {
    fn page_count(&self) -> Result<usize, BookdexError> {
        let output = run_poppler(Command::new("pdfinfo").arg(&self.path))?;
        for line in output.lines() {
            if let Some(rest) = line.strip_prefix("Pages:") {
                return rest.trim().parse().map_err(|_| {
                    BookdexError::Source(format!("unparseable pdfinfo page count: {line}"))
                });
            }
        }
        Err(BookdexError::Source(
            "pdfinfo output did not report a page count".into(),
        ))
    }

    fn page_text(&self, page: usize, mode: TextMode) -> Result<String, BookdexError> {
        match mode {
            TextMode::Plain => run_poppler(
                Command::new("pdftotext")
                    .arg("-f")
                    .arg(page.to_string())
                    .arg("-l")
                    .arg(page.to_string())
                    .arg("-layout")
                    .arg(&self.path)
                    .arg("-"),
            ),
            TextMode::ColumnSorted => {
                let lines = self.bbox_lines(page)?;
                Ok(column_sorted_text(&lines))
            }
        }
    }

    fn layout_boxes(&self, page: usize) -> Result<Vec<BBox>, BookdexError> {
        let lines = self.bbox_lines(page)?;
        Ok(cluster_into_blocks(&lines))
    }

    fn backend_name(&self) -> &str {
        "pdftotext"
    }
}

/// Run a poppler tool, mapping missing binaries and non-zero exits to errors.
fn run_poppler(cmd: &mut Command) -> Result<String, BookdexError> {
    let output = cmd.output().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            BookdexError::PdftotextNotFound
        } else {
            BookdexError::Source(format!("poppler invocation failed: {e}"))
        }
    })?;

    if !output.status.success() {
        let code = output.status.code().unwrap_or(-1);
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        return Err(BookdexError::PdftotextFailed { code, stderr });
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

#[derive(Debug, Clone)]
struct BBoxLine {
    text: String,
    bbox: BBox,
}

/// Parse the XML emitted by `pdftotext -bbox-layout` into text lines with
/// their bounding boxes.
fn parse_bbox_xml(xml: &str) -> Vec<BBoxLine> {
    let mut out = Vec::new();
    let mut current_bbox: Option<BBox> = None;
    let mut current_words: Vec<String> = Vec::new();

    for raw in xml.lines() {
        let line = raw.trim();

        if line.starts_with("<line ") {
            current_bbox = parse_line_bbox(line);
            current_words.clear();
            continue;
        }

        if line.starts_with("<word ") {
            if let Some(word_text) = parse_word_text(line) {
                let w = decode_xml_entities(&word_text).trim().to_string();
                if !w.is_empty() {
                    current_words.push(w);
                }
            }
            continue;
        }

        if line.starts_with("</line>") {
            if let Some(bbox) = current_bbox.take() {
                let text = current_words.join(" ");
                if !text.is_empty() {
                    out.push(BBoxLine { text, bbox });
                }
            }
            current_words.clear();
        }
    }

    out
}

/// Group lines into text blocks by horizontal overlap and merge their boxes.
fn cluster_into_blocks(lines: &[BBoxLine]) -> Vec<BBox> {
    let mut blocks: Vec<BBox> = Vec::new();

    for line in lines {
        match blocks
            .iter()
            .position(|b| b.overlaps_horizontally(&line.bbox))
        {
            Some(i) => {
                let block = &mut blocks[i];
                block.x_min = block.x_min.min(line.bbox.x_min);
                block.y_min = block.y_min.min(line.bbox.y_min);
                block.x_max = block.x_max.max(line.bbox.x_max);
                block.y_max = block.y_max.max(line.bbox.y_max);
            }
            None => blocks.push(line.bbox),
        }
    }

    blocks
}

/// Emit lines in column reading order: when the page clusters into two
/// disjoint blocks, the left block is read top to bottom before the right
/// one; otherwise lines are ordered by vertical then horizontal position.
fn column_sorted_text(lines: &[BBoxLine]) -> String {
    let blocks = cluster_into_blocks(lines);

    let mut ordered: Vec<&BBoxLine> = lines.iter().collect();
    if blocks.len() == 2 && !blocks[0].overlaps_horizontally(&blocks[1]) {
        // Left edge of the right-hand block.
        let split = blocks[0].x_min.max(blocks[1].x_min);
        ordered.sort_by(|a, b| {
            let col_a = a.bbox.x_min >= split;
            let col_b = b.bbox.x_min >= split;
            col_a
                .cmp(&col_b)
                .then(a.bbox.y_min.total_cmp(&b.bbox.y_min))
        });
    } else {
        ordered.sort_by(|a, b| {
            a.bbox
                .y_min
                .total_cmp(&b.bbox.y_min)
                .then(a.bbox.x_min.total_cmp(&b.bbox.x_min))
        });
    }

    let mut text = String::new();
    for line in ordered {
        text.push_str(&line.text);
        text.push('\n');
    }
    text
}

fn parse_attr_f32(tag: &str, name: &str) -> Option<f32> {
    parse_attr(tag, name)?.parse().ok()
}

fn parse_attr<'a>(tag: &'a str, name: &str) -> Option<&'a str> {
    let needle = format!("{}=\"", name);
    let start = tag.find(&needle)? + needle.len();
    let rest = &tag[start..];
    let end = rest.find('"')?;
    Some(&rest[..end])
}

fn parse_line_bbox(line_tag: &str) -> Option<BBox> {
    Some(BBox {
        x_min: parse_attr_f32(line_tag, "xMin")?,
        y_min: parse_attr_f32(line_tag, "yMin")?,
        x_max: parse_attr_f32(line_tag, "xMax")?,
        y_max: parse_attr_f32(line_tag, "yMax")?,
    })
}

fn parse_word_text(word_tag: &str) -> Option<String> {
    let start = word_tag.find('>')? + 1;
    let end = word_tag.rfind("</word>")?;
    Some(word_tag[start..end].to_string())
}

fn decode_xml_entities(s: &str) -> String {
    s.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(text: &str, x_min: f32, y_min: f32, x_max: f32, y_max: f32) -> BBoxLine {
        BBoxLine {
            text: text.to_string(),
            bbox: BBox {
                x_min,
                y_min,
                x_max,
                y_max,
            },
        }
    }

    #[test]
    fn test_parse_bbox_xml_lines() {
        let xml = r#"
<doc>
  <page width="612" height="792">
    <flow>
      <block xMin="56.0" yMin="70.0" xMax="280.0" yMax="90.0">
        <line xMin="56.0" yMin="70.0" xMax="160.0" yMax="82.0">
          <word xMin="56.0" yMin="70.0" xMax="110.0" yMax="82.0">Cats,</word>
          <word xMin="114.0" yMin="70.0" xMax="122.0" yMax="82.0">3</word>
        </line>
      </block>
    </flow>
  </page>
</doc>
"#;
        let lines = parse_bbox_xml(xml);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "Cats, 3");
        assert_eq!(lines[0].bbox.x_min, 56.0);
    }

    #[test]
    fn test_cluster_two_columns() {
        let lines = vec![
            line("left one", 56.0, 70.0, 280.0, 82.0),
            line("right one", 320.0, 70.0, 540.0, 82.0),
            line("left two", 56.0, 90.0, 270.0, 102.0),
            line("right two", 320.0, 90.0, 530.0, 102.0),
        ];
        let blocks = cluster_into_blocks(&lines);
        assert_eq!(blocks.len(), 2);
        assert!(blocks[0].x_max < blocks[1].x_min);
    }

    #[test]
    fn test_column_sorted_reads_left_column_first() {
        let lines = vec![
            line("right one", 320.0, 70.0, 540.0, 82.0),
            line("left one", 56.0, 70.0, 280.0, 82.0),
            line("left two", 56.0, 90.0, 270.0, 102.0),
            line("right two", 320.0, 90.0, 530.0, 102.0),
        ];
        let text = column_sorted_text(&lines);
        assert_eq!(text, "left one\nleft two\nright one\nright two\n");
    }

    #[test]
    fn test_column_sorted_single_block_by_position() {
        let lines = vec![
            line("second", 56.0, 90.0, 280.0, 102.0),
            line("first", 56.0, 70.0, 280.0, 82.0),
        ];
        let text = column_sorted_text(&lines);
        assert_eq!(text, "first\nsecond\n");
    }
}
