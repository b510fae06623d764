//! Streaming substitution of a placeholder token in a config template.
//!
//! The expansion never loads the whole file: input is consumed byte by
//! byte while a single cursor tracks the longest prefix of the token
//! matched so far. On a broken partial match only the non-reusable prefix
//! is flushed, so overlapping near-matches (token `aab`, input `aaab`)
//! still substitute correctly.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template token must not be empty")]
    EmptyToken,
    #[error("cannot open template {path}: {source}")]
    OpenSource { path: String, source: io::Error },
    #[error("cannot create generated file {path}: {source}")]
    CreateDestination { path: String, source: io::Error },
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Copies `reader` to `writer`, replacing every non-overlapping literal
/// occurrence of `find` with `replace`. Single pass: a `replace` value
/// containing `find` is never re-substituted.
///
/// Callers should hand in buffered streams; [`expand_file`] does.
pub fn expand<R, W>(reader: R, mut writer: W, find: &str, replace: &str) -> Result<(), TemplateError>
where
    R: Read,
    W: Write,
{
    if find.is_empty() {
        return Err(TemplateError::EmptyToken);
    }
    let token = find.as_bytes();
    let border = border_table(token);

    // matched = longueur du préfixe du jeton reconnu jusqu'ici
    let mut matched = 0usize;
    for byte in reader.bytes() {
        let b = byte?;
        loop {
            if b == token[matched] {
                matched += 1;
                if matched == token.len() {
                    writer.write_all(replace.as_bytes())?;
                    matched = 0;
                }
                break;
            }
            if matched == 0 {
                writer.write_all(&[b])?;
                break;
            }
            // Broken partial match: flush what cannot start a new match,
            // keep the longest border, re-examine the current byte.
            let keep = border[matched];
            writer.write_all(&token[..matched - keep])?;
            matched = keep;
        }
    }
    if matched > 0 {
        writer.write_all(&token[..matched])?;
    }
    writer.flush()?;
    Ok(())
}

/// Expands `source` into `destination`. Open/create failures are static
/// faults reported as such; the orchestration must not retry them.
pub fn expand_file(
    source: &Path,
    destination: &Path,
    find: &str,
    replace: &str,
) -> Result<(), TemplateError> {
    let input = File::open(source).map_err(|source_err| TemplateError::OpenSource {
        path: source.display().to_string(),
        source: source_err,
    })?;
    let output = File::create(destination).map_err(|source_err| TemplateError::CreateDestination {
        path: destination.display().to_string(),
        source: source_err,
    })?;
    debug!(
        source = %source.display(),
        destination = %destination.display(),
        token = find,
        "expanding template"
    );
    expand(BufReader::new(input), BufWriter::new(output), find, replace)
}

/// `border[m]` = length of the longest proper border of `token[..m]`
/// (both a prefix and a suffix).
fn border_table(token: &[u8]) -> Vec<usize> {
    let mut border = vec![0usize; token.len() + 1];
    let mut k = 0usize;
    for i in 1..token.len() {
        while k > 0 && token[i] != token[k] {
            k = border[k];
        }
        if token[i] == token[k] {
            k += 1;
        }
        border[i + 1] = k;
    }
    border
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn run(input: &str, find: &str, replace: &str) -> String {
        let mut out = Vec::new();
        expand(Cursor::new(input.as_bytes()), &mut out, find, replace).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_no_occurrence() {
        assert_eq!(run("port \"6600\"\n", "%ROOT%", "/media/sda1"), "port \"6600\"\n");
    }

    #[test]
    fn test_single_occurrence() {
        assert_eq!(
            run("music_directory \"%ROOT%\"\n", "%ROOT%", "/media/sda1"),
            "music_directory \"/media/sda1\"\n"
        );
    }

    #[test]
    fn test_multiple_occurrences() {
        assert_eq!(run("a%X%b%X%c%X%", "%X%", "1"), "a1b1c1");
    }

    #[test]
    fn test_adjacent_occurrences() {
        assert_eq!(run("%X%%X%", "%X%", "y"), "yy");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(run("", "%X%", "y"), "");
    }

    #[test]
    fn test_overlap_keeps_reusable_prefix() {
        // jeton "aab", entrée "aaab" : un seul "a" littéral, une substitution
        assert_eq!(run("aaab", "aab", "X"), "aX");
        assert_eq!(run("aaaab", "aab", "X"), "aaX");
    }

    #[test]
    fn test_partial_match_flushed_at_eof() {
        assert_eq!(run("foo%RO", "%ROOT%", "x"), "foo%RO");
        assert_eq!(run("%ROOT", "%ROOT%", "x"), "%ROOT");
    }

    #[test]
    fn test_broken_partial_match_flushed_literally() {
        assert_eq!(run("%ROT%", "%ROOT%", "x"), "%ROT%");
        assert_eq!(run("a%RO%ROOT%b", "%ROOT%", "x"), "a%ROxb");
    }

    #[test]
    fn test_single_pass_not_recursive() {
        // le remplacement contient le jeton : pas de re-substitution
        assert_eq!(run("-%X%-", "%X%", "<%X%>"), "-<%X%>-");
    }

    #[test]
    fn test_empty_token_rejected() {
        let mut out = Vec::new();
        let err = expand(Cursor::new(b"abc".as_slice()), &mut out, "", "x").unwrap_err();
        assert!(matches!(err, TemplateError::EmptyToken));
    }

    #[test]
    fn test_expand_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("mpd.conf.in");
        let dst = dir.path().join("mpd.conf");
        std::fs::write(&src, "ROOT=%ROOT%\nother=1\n").unwrap();

        expand_file(&src, &dst, "%ROOT%", "/media/sda1").unwrap();

        let generated = std::fs::read_to_string(&dst).unwrap();
        assert_eq!(generated, "ROOT=/media/sda1\nother=1\n");
    }

    #[test]
    fn test_expand_file_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        let err = expand_file(
            &dir.path().join("absent.in"),
            &dir.path().join("out.conf"),
            "%ROOT%",
            "x",
        )
        .unwrap_err();
        assert!(matches!(err, TemplateError::OpenSource { .. }));
    }
}
