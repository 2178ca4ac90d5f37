/// Tokenizer for SVG path data (`d` attribute)
///
/// The grammar handled here is the subset the heatmap uses: a command letter
/// followed by a list of numbers separated by whitespace and/or commas.
/// Numbers follow SVG rules, so `1-2` is two numbers and `.5.5` is `.5` then `.5`.
use std::fmt;

/// A lexical token of path data
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathToken {
    Command(char),
    Number(f64),
}

/// Tokenizer failure with the byte offset where it happened
#[derive(Debug, Clone, PartialEq)]
pub struct PathError {
    pub offset: usize,
    pub message: String,
}

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at offset {}", self.message, self.offset)
    }
}

impl std::error::Error for PathError {}

/// Streaming tokenizer over path data
pub struct PathTokenizer<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> PathTokenizer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn skip_separators(&mut self) {
        while let Some(b) = self.peek() {
            if b.is_ascii_whitespace() || b == b',' {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn eat_digits(&mut self) -> usize {
        let start = self.pos;
        while matches!(self.peek(), Some(b) if b.is_ascii_digit()) {
            self.pos += 1;
        }
        self.pos - start
    }

    fn read_number(&mut self) -> Result<f64, PathError> {
        let start = self.pos;

        if matches!(self.peek(), Some(b'+') | Some(b'-')) {
            self.pos += 1;
        }
        let mut digits = self.eat_digits();
        if self.peek() == Some(b'.') {
            self.pos += 1;
            digits += self.eat_digits();
        }
        if digits == 0 {
            return Err(PathError {
                offset: start,
                message: format!("expected number, found {:?}", &self.src[start..self.pos.max(start + 1).min(self.src.len())]),
            });
        }

        // Exponent only counts when digits follow it
        if matches!(self.peek(), Some(b'e') | Some(b'E')) {
            let mark = self.pos;
            self.pos += 1;
            if matches!(self.peek(), Some(b'+') | Some(b'-')) {
                self.pos += 1;
            }
            if self.eat_digits() == 0 {
                self.pos = mark;
            }
        }

        let text = &self.src[start..self.pos];
        text.parse::<f64>().map_err(|e| PathError {
            offset: start,
            message: format!("invalid number {:?}: {}", text, e),
        })
    }
}

impl<'a> Iterator for PathTokenizer<'a> {
    type Item = Result<PathToken, PathError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.skip_separators();
        let b = self.peek()?;

        if b.is_ascii_alphabetic() && b != b'e' && b != b'E' {
            self.pos += 1;
            return Some(Ok(PathToken::Command(b as char)));
        }

        if b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.') {
            let result = self.read_number().map(PathToken::Number);
            if result.is_err() {
                // Stop after the first error
                self.pos = self.src.len();
            }
            return Some(result);
        }

        let offset = self.pos;
        let ch = self.src[offset..].chars().next().unwrap_or('?');
        self.pos = self.src.len();
        Some(Err(PathError {
            offset,
            message: format!("unexpected character {:?}", ch),
        }))
    }
}

/// A command letter with its numeric arguments
#[derive(Debug, Clone, PartialEq)]
pub struct PathSegment {
    pub command: char,
    pub args: Vec<f64>,
}

impl PathSegment {
    /// Commands whose arguments are harvested as heatmap coordinates
    pub fn carries_coordinates(&self) -> bool {
        matches!(self.command, 'M' | 'C')
    }

    /// Consecutive `(x, y)` pairs; errors on an unmatched trailing value
    pub fn points(&self) -> Result<Vec<(f64, f64)>, PathError> {
        if self.args.len() % 2 != 0 {
            return Err(PathError {
                offset: 0,
                message: format!(
                    "'{}' segment has {} values, expected coordinate pairs",
                    self.command,
                    self.args.len()
                ),
            });
        }
        Ok(self.args.chunks_exact(2).map(|pair| (pair[0], pair[1])).collect())
    }
}

/// Group tokens into segments; numbers before the first command are an error
pub fn parse_segments(d: &str) -> Result<Vec<PathSegment>, PathError> {
    let mut segments: Vec<PathSegment> = Vec::new();

    for token in PathTokenizer::new(d) {
        match token? {
            PathToken::Command(command) => segments.push(PathSegment {
                command,
                args: Vec::new(),
            }),
            PathToken::Number(value) => match segments.last_mut() {
                Some(segment) => segment.args.push(value),
                None => {
                    return Err(PathError {
                        offset: 0,
                        message: "path data starts with a number".to_string(),
                    })
                }
            },
        }
    }

    Ok(segments)
}

/// All `(x, y)` pairs from move-to and curve-to segments, in path order
pub fn coordinate_pairs(d: &str) -> Result<Vec<(f64, f64)>, PathError> {
    let mut points = Vec::new();
    for segment in parse_segments(d)?.iter().filter(|s| s.carries_coordinates()) {
        points.extend(segment.points()?);
    }
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbers(d: &str) -> Vec<f64> {
        PathTokenizer::new(d)
            .filter_map(|t| match t.unwrap() {
                PathToken::Number(n) => Some(n),
                PathToken::Command(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_tokenizes_heatmap_path() {
        let tokens: Vec<PathToken> = PathTokenizer::new("M 0.0,100.0 C 1.0,89.9 2.0,78.5 5.0,60.0")
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(tokens[0], PathToken::Command('M'));
        assert_eq!(tokens[1], PathToken::Number(0.0));
        assert_eq!(tokens[2], PathToken::Number(100.0));
        assert_eq!(tokens[3], PathToken::Command('C'));
        assert_eq!(tokens.len(), 10);
    }

    #[test]
    fn test_compact_number_forms() {
        assert_eq!(numbers("M1-2"), vec![1.0, -2.0]);
        assert_eq!(numbers("M.5.5"), vec![0.5, 0.5]);
        assert_eq!(numbers("M1e2,3E-1"), vec![100.0, 0.3]);
        assert_eq!(numbers("M\t1 ,\n 2"), vec![1.0, 2.0]);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(parse_segments("M 1,2 # 3").is_err());
        assert!(parse_segments("M 1,-").is_err());
        assert!(parse_segments("1,2 M 3,4").is_err());
    }

    #[test]
    fn test_only_move_and_curve_supply_points() {
        let points = coordinate_pairs("M 0,100 L 7,7 C 1,90 2,80 3,70 Z").unwrap();
        assert_eq!(points, vec![(0.0, 100.0), (1.0, 90.0), (2.0, 80.0), (3.0, 70.0)]);
    }

    #[test]
    fn test_odd_payload_is_an_error() {
        let err = coordinate_pairs("M 0,100 C 1,90 2").unwrap_err();
        assert!(err.message.contains("3 values"));
    }
}
