//! Single-pass PDF writer for the project download. Renders arbitrary text in
//! a fixed-width font, wraps it into fixed-size cells, and paginates
//! automatically. Characters outside Latin-1 are substituted with `?` rather
//! than rejected, matching the single-byte encoding of the embedded font.

const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const MARGIN: f32 = 40.0;
const FONT_SIZE: f32 = 12.0;
const LINE_HEIGHT: f32 = 14.0;

/// Courier at 12pt advances 7.2pt per glyph.
const CHARS_PER_LINE: usize = 71;
const LINES_PER_PAGE: usize = 54;

const REPLACEMENT: u8 = b'?';

/// Render `content` into a complete PDF document held in memory.
pub fn render_document(content: &str) -> Vec<u8> {
    let lines: Vec<Vec<u8>> = content
        .split('\n')
        .flat_map(|line| wrap_cells(line, CHARS_PER_LINE))
        .map(|cell| encode_latin1(&cell))
        .collect();

    let pages: Vec<&[Vec<u8>]> = if lines.is_empty() {
        vec![&[][..]]
    } else {
        lines.chunks(LINES_PER_PAGE).collect()
    };

    assemble(&pages)
}

/// Split one logical line into fixed-width cells, counting characters rather
/// than bytes so multi-byte input cannot overflow a cell after substitution.
fn wrap_cells(line: &str, width: usize) -> Vec<String> {
    let chars: Vec<char> = line.chars().collect();
    if chars.is_empty() {
        return vec![String::new()];
    }

    chars
        .chunks(width)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

/// Degrade to Latin-1: every scalar above U+00FF becomes the replacement byte.
fn encode_latin1(text: &str) -> Vec<u8> {
    text.chars()
        .map(|ch| {
            let code = ch as u32;
            if code <= 0xFF { code as u8 } else { REPLACEMENT }
        })
        .collect()
}

/// Escape the PDF string delimiters inside a text-show operand.
fn escape_pdf_text(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    for &byte in raw {
        match byte {
            b'\\' | b'(' | b')' => {
                out.push(b'\\');
                out.push(byte);
            }
            _ => out.push(byte),
        }
    }
    out
}

fn page_content_stream(lines: &[Vec<u8>]) -> Vec<u8> {
    let mut stream = Vec::new();
    stream.extend_from_slice(b"BT\n");
    stream.extend_from_slice(format!("/F1 {FONT_SIZE} Tf\n").as_bytes());
    stream.extend_from_slice(format!("{LINE_HEIGHT} TL\n").as_bytes());
    let start_y = PAGE_HEIGHT - MARGIN - FONT_SIZE;
    stream.extend_from_slice(format!("1 0 0 1 {MARGIN} {start_y} Tm\n").as_bytes());
    for line in lines {
        stream.push(b'(');
        stream.extend_from_slice(&escape_pdf_text(line));
        stream.extend_from_slice(b") Tj\nT*\n");
    }
    stream.extend_from_slice(b"ET\n");
    stream
}

/// Lay out the object graph: catalog, page tree, font, then one page object
/// plus one content stream per page. Object numbers are assigned up front so
/// the page tree can reference its kids before they are written.
fn assemble(pages: &[&[Vec<u8>]]) -> Vec<u8> {
    let page_count = pages.len();
    let total_objects = 3 + page_count * 2;

    let kids = (0..page_count)
        .map(|idx| format!("{} 0 R", 4 + idx * 2))
        .collect::<Vec<_>>()
        .join(" ");

    let mut objects: Vec<Vec<u8>> = Vec::with_capacity(total_objects);
    objects.push(b"<< /Type /Catalog /Pages 2 0 R >>".to_vec());
    objects.push(
        format!("<< /Type /Pages /Kids [{kids}] /Count {page_count} >>").into_bytes(),
    );
    objects.push(b"<< /Type /Font /Subtype /Type1 /BaseFont /Courier >>".to_vec());

    for (idx, lines) in pages.iter().enumerate() {
        let content_id = 5 + idx * 2;
        objects.push(
            format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {PAGE_WIDTH} {PAGE_HEIGHT}] \
                 /Resources << /Font << /F1 3 0 R >> >> /Contents {content_id} 0 R >>"
            )
            .into_bytes(),
        );

        let stream = page_content_stream(lines);
        let mut content = format!("<< /Length {} >>\nstream\n", stream.len()).into_bytes();
        content.extend_from_slice(&stream);
        content.extend_from_slice(b"\nendstream");
        objects.push(content);
    }

    let mut out = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n");

    let mut offsets = Vec::with_capacity(total_objects);
    for (idx, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n", idx + 1).as_bytes());
        out.extend_from_slice(body);
        out.extend_from_slice(b"\nendobj\n");
    }

    let xref_offset = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n", total_objects + 1).as_bytes());
    out.extend_from_slice(b"0000000000 65535 f \n");
    for offset in offsets {
        out.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            total_objects + 1,
            xref_offset
        )
        .as_bytes(),
    );

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count_pages(pdf: &[u8]) -> usize {
        let haystack = String::from_utf8_lossy(pdf);
        haystack.matches("/Type /Page /Parent").count()
    }

    #[test]
    fn renders_valid_shell() {
        let pdf = render_document("hello world");
        assert!(pdf.starts_with(b"%PDF-1.4\n"));
        assert!(pdf.ends_with(b"%%EOF\n"));
        assert_eq!(count_pages(&pdf), 1);
    }

    #[test]
    fn long_input_paginates() {
        let content = vec!["line"; LINES_PER_PAGE * 2 + 1].join("\n");
        let pdf = render_document(&content);
        assert_eq!(count_pages(&pdf), 3);
    }

    #[test]
    fn wrap_cells_counts_characters_not_bytes() {
        let cells = wrap_cells(&"é".repeat(10), 4);
        assert_eq!(cells.len(), 3);
        assert_eq!(cells[0].chars().count(), 4);
        assert_eq!(cells[2].chars().count(), 2);
    }

    #[test]
    fn wrap_cells_preserves_empty_lines() {
        assert_eq!(wrap_cells("", 10), vec![String::new()]);
    }

    #[test]
    fn latin1_substitutes_out_of_range_scalars() {
        assert_eq!(encode_latin1("café"), vec![b'c', b'a', b'f', 0xE9]);
        assert_eq!(encode_latin1("a→b"), vec![b'a', b'?', b'b']);
    }

    #[test]
    fn parentheses_are_escaped_in_streams() {
        let pdf = render_document("fn main() {}");
        let haystack = String::from_utf8_lossy(&pdf);
        assert!(haystack.contains(r"fn main\(\) {}"));
    }
}
