use lazy_regex::{lazy_regex, Lazy, Regex};

use crate::rich_text::RichText;

pub const LINE_FEED: &str = "\n";

/// Integers longer than this are compared like floats.
pub const VALID_INT_MAX_LEN: usize = 18;

static INT_RE: Lazy<Regex> = lazy_regex!(r"^[+-]?[0-9]+$");
static FLOAT_RE: Lazy<Regex> = lazy_regex!(r"^[+-]?([0-9]+\.[0-9]*|\.[0-9]+|[0-9]+)$");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LexemeKind {
    Int,
    Float,
    Str,
}

impl LexemeKind {
    pub fn of(xm: &str) -> Self {
        if is_int_lexeme(xm) {
            Self::Int
        } else if is_float_lexeme(xm) {
            Self::Float
        } else {
            Self::Str
        }
    }
}

pub fn is_int_lexeme(xm: &str) -> bool {
    INT_RE.is_match(xm) && split_sign(xm).1.len() <= VALID_INT_MAX_LEN
}

pub fn is_float_lexeme(xm: &str) -> bool {
    FLOAT_RE.is_match(xm)
}

/// Splits text into lexemes: maximal runs of non-whitespace, and every `'\n'` on its own.
pub fn scan(text: &str) -> Vec<&str> {
    let mut xms = Vec::new();
    let mut start = None;
    for (i, c) in text.char_indices() {
        if c == '\n' {
            if let Some(s) = start.take() {
                xms.push(&text[s..i]);
            }
            xms.push(&text[i..i + 1]);
        } else if c.is_whitespace() {
            if let Some(s) = start.take() {
                xms.push(&text[s..i]);
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        xms.push(&text[s..]);
    }
    xms
}

fn split_sign(xm: &str) -> (&str, &str) {
    match xm.as_bytes().first() {
        Some(b'+' | b'-') => xm.split_at(1),
        _ => ("", xm),
    }
}

fn line_feed_run(xms: &[&str]) -> usize {
    xms.iter().take_while(|&&xm| xm == LINE_FEED).count()
}

/// Marks digits of `target` against `source`, both aligned on their last digit.
fn right_aligned_mask(target: &[u8], source: &[u8]) -> Vec<bool> {
    let excess = target.len().saturating_sub(source.len());
    let skip = source.len().saturating_sub(target.len());
    (0..target.len())
        .map(|i| i < excess || target[i] != source[skip + i - excess])
        .collect()
}

/// Token-wise comparator with numeric awareness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lexer {
    /// Number of fraction digits significant when comparing floats.
    pub precision: u8,
}

impl Lexer {
    pub const fn new(precision: u8) -> Self {
        Self { precision }
    }

    /// Highlights every char of `target` that has no equal counterpart in `source`.
    ///
    /// Returns one [`RichText`] per target lexeme and whether nothing was highlighted.
    pub fn compare(&self, target: &[&str], source: &[&str]) -> (Vec<RichText>, bool) {
        let mut rts = Vec::with_capacity(target.len());
        let mut ok = true;
        let (mut ti, mut si) = (0, 0);

        while ti < target.len() {
            if si >= source.len() {
                if target[ti] == LINE_FEED {
                    rts.push(RichText::plain(target[ti]));
                } else {
                    rts.push(RichText::highlighted(target[ti]));
                    ok = false;
                }
                ti += 1;
                continue;
            }

            let t_lfs = line_feed_run(&target[ti..]);
            let s_lfs = line_feed_run(&source[si..]);
            match (t_lfs, s_lfs) {
                (0, 0) => {
                    let mask = self.gen_mask(target[ti], source[si]);
                    let rt = RichText::new(target[ti], mask);
                    ok &= !rt.is_colorful();
                    rts.push(rt);
                    ti += 1;
                    si += 1;
                }
                (0, _) => si += s_lfs,
                (_, 0) => {
                    rts.extend(target[ti..ti + t_lfs].iter().map(|&xm| RichText::highlighted(xm)));
                    ok = false;
                    ti += t_lfs;
                }
                (_, _) => {
                    rts.extend(target[ti..ti + t_lfs].iter().map(|&xm| RichText::plain(xm)));
                    ti += t_lfs;
                    si += s_lfs;
                }
            }
        }
        (rts, ok)
    }

    /// Dispatches on the lexeme kinds; tokens of different kinds never match.
    pub fn gen_mask(&self, target: &str, source: &str) -> Vec<bool> {
        use LexemeKind::*;
        match (LexemeKind::of(target), LexemeKind::of(source)) {
            (Int, Int) => self.gen_mask_for_int(target, source),
            (Float, Float) => self.gen_mask_for_float(target, source),
            (Str, Str) => self.gen_mask_for_string(target, source),
            _ => vec![true; target.chars().count()],
        }
    }

    pub fn gen_mask_for_string(&self, target: &str, source: &str) -> Vec<bool> {
        let source: Vec<char> = source.chars().collect();
        target
            .chars()
            .enumerate()
            .map(|(i, c)| source.get(i) != Some(&c))
            .collect()
    }

    /// Both operands must be integer lexemes (the integral part of a float is fine too).
    pub fn gen_mask_for_int(&self, target: &str, source: &str) -> Vec<bool> {
        if !target.is_ascii() || !source.is_ascii() {
            return self.gen_mask_for_string(target, source);
        }
        let (t_sign, t_digits) = split_sign(target);
        let (s_sign, s_digits) = split_sign(source);
        let s_digits = if s_digits.is_empty() { "0" } else { s_digits };

        if (t_sign == "-") != (s_sign == "-") {
            return vec![true; target.len()];
        }
        let mut mask = vec![false; t_sign.len()];
        mask.extend(right_aligned_mask(t_digits.as_bytes(), s_digits.as_bytes()));
        mask
    }

    /// Both operands must be float lexemes.
    pub fn gen_mask_for_float(&self, target: &str, source: &str) -> Vec<bool> {
        if !target.is_ascii() || !source.is_ascii() {
            return self.gen_mask_for_string(target, source);
        }
        let (t_int, t_frac) = target.split_once('.').unwrap_or((target, ""));
        let (s_int, s_frac) = source.split_once('.').unwrap_or((source, ""));

        let mut mask = self.gen_mask_for_int(t_int, s_int);
        if target.contains('.') {
            mask.push(false);
        }

        let (tf, sf) = (t_frac.as_bytes(), s_frac.as_bytes());
        let prec = usize::from(self.precision);
        let mut frac_mask = vec![false; tf.len()];

        let digit_at = |digits: &[u8], i: usize| digits.get(i).copied().unwrap_or(b'0');
        let equal = (0..prec).all(|i| digit_at(tf, i) == digit_at(sf, i));
        if !equal {
            let common = tf.len().min(sf.len()).min(prec);
            for i in 0..common {
                frac_mask[i] = tf[i] != sf[i];
            }
            for flag in frac_mask.iter_mut().take(tf.len().min(prec)).skip(common) {
                *flag = true;
            }
        }
        mask.extend(frac_mask);
        mask
    }
}

impl Default for Lexer {
    fn default() -> Self {
        Self::new(6)
    }
}
