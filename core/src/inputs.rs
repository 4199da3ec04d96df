//! Parser for the inputs file: an optional `key = value` header, then tests
//! separated by `===` lines, each split into input and answer by a `---` line.

use std::{
    collections::HashMap,
    sync::{PoisonError, RwLock},
};

use once_cell::sync::Lazy;

use crate::{
    duration::PositiveDuration,
    error::{InputsError, LineRangeError, ScanError},
    string_map_fields,
    unmarshal::{string_map_unmarshal, upper_camel_case},
};

pub const TEST_DELIM: &str = "===";
pub const IO_DELIM: &str = "---";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Test {
    pub input: String,
    pub output: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputsConfig {
    pub prec: u8,
    pub tl: PositiveDuration,
}

string_map_fields!(InputsConfig {
    prec => "Prec",
    tl => "Tl",
});

impl Default for InputsConfig {
    fn default() -> Self {
        Self {
            prec: 6,
            tl: PositiveDuration::from_secs(6),
        }
    }
}

static DEFAULT_INPUTS_CONFIG: Lazy<RwLock<InputsConfig>> =
    Lazy::new(|| RwLock::new(InputsConfig::default()));

/// The config every [`scan_inputs`] call starts from.
pub fn default_inputs_config() -> InputsConfig {
    *DEFAULT_INPUTS_CONFIG
        .read()
        .unwrap_or_else(PoisonError::into_inner)
}

/// Replaces the process-wide default. Meant to be called once at startup.
pub fn set_default_inputs_config(config: InputsConfig) {
    *DEFAULT_INPUTS_CONFIG
        .write()
        .unwrap_or_else(PoisonError::into_inner) = config;
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Inputs {
    pub config: InputsConfig,
    pub tests: Vec<Test>,
}

impl Inputs {
    /// Serializes back to the inputs-file format.
    ///
    /// Sections followed by a delimiter line get a trailing line feed if they lack one.
    /// The last answer is written as is.
    pub fn to_text(&self) -> String {
        let mut s = format!("prec = {}\ntl = {}\n", self.config.prec, self.config.tl);
        for (i, test) in self.tests.iter().enumerate() {
            s += TEST_DELIM;
            s.push('\n');
            push_terminated(&mut s, &test.input);
            s += IO_DELIM;
            s.push('\n');
            if i + 1 < self.tests.len() {
                push_terminated(&mut s, &test.output);
            } else {
                s += &test.output;
            }
        }
        s
    }
}

fn push_terminated(s: &mut String, section: &str) {
    *s += section;
    if !section.is_empty() && !section.ends_with('\n') {
        s.push('\n');
    }
}

/// A run of lines. Each line keeps its terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block<'a> {
    /// 1-based number of the first line.
    pub begin: usize,
    pub lines: Vec<&'a str>,
}

impl<'a> Block<'a> {
    pub fn text(&self) -> String {
        self.lines.concat()
    }

    fn line_range_error(&self, err: ScanError) -> LineRangeError {
        LineRangeError {
            begin: self.begin,
            lines: self.lines.iter().map(|l| chomp(l).to_owned()).collect(),
            err,
        }
    }
}

fn chomp(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

/// Splits `text` at lines starting with `delim`, dropping those lines.
///
/// At most `n` blocks are produced when `n > 0`; the last one then holds
/// everything after the `(n-1)`-th delimiter.
pub fn split_by_inlined_prefix<'a>(text: &'a str, delim: &str, n: usize) -> Vec<Block<'a>> {
    let lines: Vec<&str> = text.split_inclusive('\n').collect();
    split_lines(&lines, 1, delim, n)
}

fn split_lines<'a>(lines: &[&'a str], begin: usize, delim: &str, n: usize) -> Vec<Block<'a>> {
    let mut blocks = Vec::new();
    let mut cur = Block {
        begin,
        lines: Vec::new(),
    };
    for (i, &line) in lines.iter().enumerate() {
        let may_split = n == 0 || blocks.len() + 1 < n;
        if may_split && line.starts_with(delim) {
            let next = Block {
                begin: begin + i + 1,
                lines: Vec::new(),
            };
            blocks.push(std::mem::replace(&mut cur, next));
        } else {
            cur.lines.push(line);
        }
    }
    blocks.push(cur);
    blocks
}

fn scan_test_block(block: &Block) -> Result<Option<Test>, ScanError> {
    let parts = split_lines(&block.lines, block.begin, IO_DELIM, 2);
    match parts.as_slice() {
        [input, output] => Ok(Some(Test {
            input: input.text(),
            output: output.text(),
        })),
        _ if block.lines.is_empty() => Ok(None),
        _ => Err(ScanError::IoSeparatorMissing),
    }
}

/// Parses a single test. `Ok(None)` means the text was empty and the test is elided.
pub fn scan_test(text: &str) -> Result<Option<Test>, ScanError> {
    let lines: Vec<&str> = text.split_inclusive('\n').collect();
    scan_test_block(&Block { begin: 1, lines })
}

/// Parses a `key = value` line. Blank lines yield `Ok(None)`; a line without `=` has an empty value.
pub fn scan_key_value_pair(line: &str) -> Result<Option<(String, String)>, ScanError> {
    if line.trim().is_empty() {
        return Ok(None);
    }
    let (key, value) = line.split_once('=').unwrap_or((line, ""));
    let key = key.trim();
    if key.is_empty() {
        return Err(ScanError::KeyMissing);
    }
    Ok(Some((key.to_owned(), value.trim().to_owned())))
}

#[derive(Debug)]
struct KeyValue<'a> {
    value: String,
    line_num: usize,
    line: &'a str,
}

fn scan_config_block<'a>(block: &Block<'a>) -> (HashMap<String, KeyValue<'a>>, Vec<LineRangeError>) {
    let mut kvm = HashMap::new();
    let mut errs = Vec::new();
    for (i, &line) in block.lines.iter().enumerate() {
        let line_num = block.begin + i;
        match scan_key_value_pair(line) {
            Ok(Some((key, value))) => {
                kvm.insert(
                    key,
                    KeyValue {
                        value,
                        line_num,
                        line,
                    },
                );
            }
            Ok(None) => (),
            Err(err) => errs.push(LineRangeError {
                begin: line_num,
                lines: vec![chomp(line).to_owned()],
                err,
            }),
        }
    }
    (kvm, errs)
}

/// Parses the config header. Duplicate keys keep the last value.
pub fn scan_config(text: &str) -> (HashMap<String, String>, Vec<LineRangeError>) {
    let lines: Vec<&str> = text.split_inclusive('\n').collect();
    let (kvm, errs) = scan_config_block(&Block { begin: 1, lines });
    let kvm = kvm.into_iter().map(|(k, kv)| (k, kv.value)).collect();
    (kvm, errs)
}

pub fn scan_inputs(text: &str) -> (Inputs, Vec<InputsError>) {
    scan_inputs_with(text, default_inputs_config())
}

/// Parses a whole inputs file, starting from `config`.
///
/// Never fails as a whole: problems are collected and parsing goes on.
/// Errors are ordered by position except for config field errors, which follow
/// the other config errors.
pub fn scan_inputs_with(text: &str, config: InputsConfig) -> (Inputs, Vec<InputsError>) {
    let mut inputs = Inputs {
        config,
        tests: Vec::new(),
    };
    let mut errs = Vec::new();
    let mut test_num = 0;

    for (i, block) in split_by_inlined_prefix(text, TEST_DELIM, 0).iter().enumerate() {
        let scanned = scan_test_block(block);
        if i == 0 && scanned.is_err() {
            let (kvm, line_errs) = scan_config_block(block);
            errs.extend(line_errs.into_iter().map(InputsError::Config));

            let field_errs = string_map_unmarshal(
                kvm.iter().map(|(k, kv)| (k, &kv.value)),
                &mut inputs.config,
                &[upper_camel_case],
            );
            for err in field_errs {
                let (begin, line) = kvm
                    .get(&err.field)
                    .map(|kv| (kv.line_num, chomp(kv.line).to_owned()))
                    .unwrap_or((block.begin, String::new()));
                errs.push(InputsError::Config(LineRangeError {
                    begin,
                    lines: vec![line],
                    err: err.into(),
                }));
            }
            continue;
        }

        match scanned {
            Ok(None) => (),
            Ok(Some(test)) => {
                test_num += 1;
                inputs.tests.push(test);
            }
            Err(err) => {
                test_num += 1;
                log::debug!("Malformed test {} at line {}", test_num, block.begin);
                errs.push(InputsError::Test {
                    test_num,
                    err: block.line_range_error(err),
                });
            }
        }
    }
    (inputs, errs)
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::*;
    use crate::error::{DurationError, FieldError, ValueError};

    fn test(input: &str, output: &str) -> Test {
        Test {
            input: input.into(),
            output: output.into(),
        }
    }

    #[test]
    fn test_split_by_inlined_prefix() {
        let blocks = split_by_inlined_prefix("a\n===\nb\nc\n=== x\nd", "===", 0);
        assert_eq!(
            blocks,
            vec![
                Block {
                    begin: 1,
                    lines: vec!["a\n"]
                },
                Block {
                    begin: 3,
                    lines: vec!["b\n", "c\n"]
                },
                Block {
                    begin: 6,
                    lines: vec!["d"]
                },
            ]
        );

        let blocks = split_by_inlined_prefix("a\n---\nb\n---\nc\n", "---", 2);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1].text(), "b\n---\nc\n");
    }

    #[test]
    fn test_scan_test() {
        assert_eq!(scan_test("1 2\n---\n3\n"), Ok(Some(test("1 2\n", "3\n"))));
        assert_eq!(scan_test("---\n"), Ok(Some(test("", ""))));
        assert_eq!(scan_test(""), Ok(None));
        assert_eq!(scan_test("1 2\n"), Err(ScanError::IoSeparatorMissing));
    }

    #[test]
    fn test_scan_key_value_pair() {
        assert_eq!(
            scan_key_value_pair("  tl = 2s \n"),
            Ok(Some(("tl".into(), "2s".into())))
        );
        assert_eq!(
            scan_key_value_pair("a = b = c"),
            Ok(Some(("a".into(), "b = c".into())))
        );
        assert_eq!(scan_key_value_pair("flag"), Ok(Some(("flag".into(), "".into()))));
        assert_eq!(scan_key_value_pair("   \n"), Ok(None));
        assert_eq!(scan_key_value_pair(" = 1"), Err(ScanError::KeyMissing));
    }

    #[test]
    fn test_scan_config_last_duplicate_wins() {
        let (kvm, errs) = scan_config("a = 1\nb = 2\na = 3\n= 4\n");
        assert_eq!(kvm.get("a").map(String::as_str), Some("3"));
        assert_eq!(kvm.get("b").map(String::as_str), Some("2"));
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].begin, 4);
        assert_eq!(errs[0].err, ScanError::KeyMissing);
    }

    #[test]
    fn test_scan_inputs_with_config() {
        let text = "tl = 2s\nprec = 3\n===\n1\n---\n2\n===\n3\n---\n4\n";
        let (inputs, errs) = scan_inputs_with(text, InputsConfig::default());
        assert!(errs.is_empty(), "{:?}", errs);
        assert_eq!(inputs.config.prec, 3);
        assert_eq!(*inputs.config.tl, Duration::from_secs(2));
        assert_eq!(inputs.tests, vec![test("1\n", "2\n"), test("3\n", "4\n")]);
    }

    #[test]
    fn test_scan_inputs_first_block_is_test() {
        let (inputs, errs) = scan_inputs_with("1\n---\n2\n", InputsConfig::default());
        assert!(errs.is_empty());
        assert_eq!(inputs.config, InputsConfig::default());
        assert_eq!(inputs.tests, vec![test("1\n", "2\n")]);
    }

    #[test]
    fn test_scan_inputs_elides_empty_tests() {
        let text = "===\n===\n1\n---\n2\n===\n";
        let (inputs, errs) = scan_inputs_with(text, InputsConfig::default());
        assert!(errs.is_empty());
        assert_eq!(inputs.tests, vec![test("1\n", "2\n")]);
    }

    #[test]
    fn test_scan_inputs_missing_io_separator() {
        let text = "===\n1\n---\n2\n===\n3\n4\n===\n5\n---\n6\n";
        let (inputs, errs) = scan_inputs_with(text, InputsConfig::default());
        assert_eq!(inputs.tests, vec![test("1\n", "2\n"), test("5\n", "6\n")]);
        assert_eq!(
            errs,
            vec![InputsError::Test {
                test_num: 2,
                err: LineRangeError {
                    begin: 6,
                    lines: vec!["3".into(), "4".into()],
                    err: ScanError::IoSeparatorMissing,
                },
            }]
        );
    }

    #[test]
    fn test_scan_inputs_config_errors() {
        let text = "prec = x\n\ntl = 5\nfoo = 1\n= 2\n===\n1\n---\n1\n";
        let (inputs, mut errs) = scan_inputs_with(text, InputsConfig::default());
        assert_eq!(inputs.tests.len(), 1);
        assert_eq!(inputs.config.prec, 6);
        assert_eq!(*inputs.config.tl, Duration::from_secs(5));

        errs.sort_by_key(|e| e.line_range().begin);
        let want = vec![
            InputsError::Config(LineRangeError {
                begin: 1,
                lines: vec!["prec = x".into()],
                err: FieldError::new("prec", ValueError::not_value_of_type("u8", "x")).into(),
            }),
            InputsError::Config(LineRangeError {
                begin: 3,
                lines: vec!["tl = 5".into()],
                err: FieldError::new("tl", DurationError::WithoutSuffix.into()).into(),
            }),
            InputsError::Config(LineRangeError {
                begin: 4,
                lines: vec!["foo = 1".into()],
                err: FieldError::new("foo", ValueError::UnknownField).into(),
            }),
            InputsError::Config(LineRangeError {
                begin: 5,
                lines: vec!["= 2".into()],
                err: ScanError::KeyMissing,
            }),
        ];
        assert_eq!(errs, want);
        assert!(errs[1].is_warning());
        assert!(!errs[0].is_warning());
    }

    #[test]
    fn test_default_inputs_config_seeds_scan() {
        let (inputs, _) = scan_inputs("1\n---\n1\n");
        assert_eq!(inputs.config, default_inputs_config());
    }

    #[test]
    fn test_to_text_round_trip() {
        let inputs = Inputs {
            config: InputsConfig {
                prec: 4,
                tl: PositiveDuration::new(Duration::from_millis(1500)),
            },
            tests: vec![test("1 2\n", "3\n"), test("", ""), test("x\n", "y\n")],
        };
        let (parsed, errs) = scan_inputs_with(&inputs.to_text(), InputsConfig::default());
        assert!(errs.is_empty(), "{:?}", errs);
        assert_eq!(parsed, inputs);
    }

    #[test]
    fn test_to_text_keeps_missing_final_line_feed() {
        for text in ["1\n---\n2", "tl = 2s\n===\n1\n---\n2\n===\n3\n---\n4"] {
            let (parsed, errs) = scan_inputs_with(text, InputsConfig::default());
            assert!(errs.is_empty(), "{:?}", errs);
            let last = parsed.tests.last().map(|t| t.output.as_str());
            assert!(matches!(last, Some("2") | Some("4")), "{:?}", last);

            let (reparsed, errs) = scan_inputs_with(&parsed.to_text(), InputsConfig::default());
            assert!(errs.is_empty(), "{:?}", errs);
            assert_eq!(reparsed, parsed);
        }
    }

    #[test]
    fn test_to_text_terminates_inner_answers() {
        let inputs = Inputs {
            config: InputsConfig::default(),
            tests: vec![test("1\n", "2"), test("3\n", "4")],
        };
        let text = inputs.to_text();
        assert!(text.ends_with("===\n1\n---\n2\n===\n3\n---\n4"), "{:?}", text);
    }
}
