use flate2::read::GzDecoder;
use rayon::prelude::*;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Field separator: a fixed string or any of several characters
pub enum Delimiter {
    Str(String),
    Chars(Vec<char>),
}

impl From<&str> for Delimiter {
    fn from(s: &str) -> Self {
        Delimiter::Str(s.to_string())
    }
}

impl From<Vec<char>> for Delimiter {
    fn from(chars: Vec<char>) -> Self {
        Delimiter::Chars(chars)
    }
}

impl From<&[char]> for Delimiter {
    fn from(chars: &[char]) -> Self {
        Delimiter::Chars(chars.to_vec())
    }
}

impl<const N: usize> From<&[char; N]> for Delimiter {
    fn from(chars: &[char; N]) -> Self {
        Delimiter::Chars(chars.to_vec())
    }
}

impl Delimiter {
    fn split<'a>(&'a self, line: &'a str) -> Box<dyn Iterator<Item = &'a str> + 'a> {
        match self {
            Delimiter::Str(s) => Box::new(line.split(s.as_str())),
            Delimiter::Chars(chars) => Box::new(line.split(chars.as_slice())),
        }
    }
}

/// Pick a delimiter from the file extension (`.csv`, `.csv.gz` → comma, else tab)
pub fn detect_delimiter(file_path: &str) -> &'static str {
    if file_path.ends_with(".csv") || file_path.ends_with(".csv.gz") {
        ","
    } else {
        "\t"
    }
}

pub struct ReadLinesOut {
    pub lines: Vec<Vec<Box<str>>>,
    pub header: Vec<Box<str>>,
}

///
/// Read a delimited text file into words
///
/// * `input_file` - file name--either gzipped or not
/// * `delim` - delimiter
/// * `hdr_line` - location of a header line (-1 = no header line)
///
/// Lines starting with `#` or `%` are skipped; surrounding quotes on
/// each word are removed.
///
pub fn read_lines_of_words_delim(
    input_file: &str,
    delim: impl Into<Delimiter>,
    hdr_line: i64,
) -> anyhow::Result<ReadLinesOut> {
    let delim = delim.into();
    let buf_reader = open_buf_reader(input_file)?;

    let lines_raw: Vec<Box<str>> = buf_reader
        .lines()
        .map_while(Result::ok)
        .filter(|x| !(x.starts_with('#') || x.starts_with('%') || x.trim().is_empty()))
        .map(|x| x.into_boxed_str())
        .collect();

    let parse = |line: &str| -> Vec<Box<str>> {
        delim
            .split(line.trim_end_matches('\r'))
            .map(|w| w.trim().trim_matches('"').into())
            .collect()
    };

    let (header, body) = if hdr_line < 0 {
        (vec![], &lines_raw[..])
    } else {
        let n_skip = hdr_line as usize;
        if lines_raw.len() < n_skip + 1 {
            anyhow::bail!("not enough lines in {}", input_file);
        }
        (parse(&lines_raw[n_skip]), &lines_raw[(n_skip + 1)..])
    };

    // parse in parallel; indexed collect keeps the line order
    let lines: Vec<Vec<Box<str>>> = body.par_iter().map(|s| parse(s)).collect();

    Ok(ReadLinesOut { lines, header })
}

///
/// Write every line into the output_file
///
/// * `lines` - vector of lines
/// * `output_file` - file name--either gzipped or not
///
pub fn write_lines<T>(lines: &[T], output_file_path: &str) -> anyhow::Result<()>
where
    T: std::fmt::Display,
{
    let mut buf = open_buf_writer(output_file_path)?;
    for line in lines {
        if let Err(e) = writeln!(buf, "{}", line) {
            if e.kind() == std::io::ErrorKind::BrokenPipe {
                return Ok(());
            } else {
                return Err(anyhow::anyhow!("unexpected error: {}", e));
            }
        }
    }
    buf.flush()?;
    Ok(())
}

///
/// Open a file for reading, and return a buffered reader
/// * `input_file` - file name--either gzipped or not
pub fn open_buf_reader(input_file: &str) -> anyhow::Result<Box<dyn BufRead>> {
    let ext = Path::new(input_file).extension().and_then(|x| x.to_str());
    let file = File::open(input_file)
        .map_err(|e| anyhow::anyhow!("failed to open {}: {}", input_file, e))?;
    match ext {
        Some("gz") => Ok(Box::new(BufReader::new(GzDecoder::new(file)))),
        _ => Ok(Box::new(BufReader::new(file))),
    }
}

///
/// Open a file for writing, and return a buffered writer
/// * `output_file` - file name--either gzipped or not
pub fn open_buf_writer(output_file: &str) -> anyhow::Result<Box<dyn Write>> {
    if output_file.eq_ignore_ascii_case("stdout") {
        return Ok(Box::new(BufWriter::new(std::io::stdout())));
    }

    let ext = Path::new(output_file).extension().and_then(|x| x.to_str());
    let file = File::create(output_file)?;
    match ext {
        Some("gz") => {
            let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
            Ok(Box::new(BufWriter::new(encoder)))
        }
        _ => Ok(Box::new(BufWriter::new(file))),
    }
}

///
/// Create the parent directory of a file if needed
/// * `file` - file name
///
pub fn mkdir(file: &str) -> anyhow::Result<()> {
    let path = Path::new(file);
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_write_gz_roundtrip() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let file = dir.path().join("table.tsv.gz");
        let file = file.to_str().unwrap();

        let lines: Vec<Box<str>> = vec!["gene\ts1\ts2".into(), "g1\t1.0\t2.0".into()];
        write_lines(&lines, file)?;

        let out = read_lines_of_words_delim(file, "\t", 0)?;
        assert_eq!(out.header.len(), 3);
        assert_eq!(out.lines.len(), 1);
        assert_eq!(out.lines[0][0].as_ref(), "g1");
        Ok(())
    }

    #[test]
    fn test_quotes_and_comments() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let file = dir.path().join("table.csv");
        let file = file.to_str().unwrap();

        let lines: Vec<Box<str>> = vec![
            "# comment".into(),
            "\"\",\"a\",\"b\"".into(),
            "\"x\",1,2".into(),
        ];
        write_lines(&lines, file)?;

        let out = read_lines_of_words_delim(file, detect_delimiter(file), 0)?;
        assert_eq!(out.header[1].as_ref(), "a");
        assert_eq!(out.lines[0][0].as_ref(), "x");
        Ok(())
    }
}
