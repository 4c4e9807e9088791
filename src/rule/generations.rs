//! The Generations rule family: a totalistic or non-totalistic birth/survival
//! rule extended with aging cell states, plus the Golly `MAP` rule-string
//! format for arbitrary lookup tables over the Moore, hexagonal, or von
//! Neumann neighborhoods.
//!
//! Grounded on `gollybase/generationsalgo.{h,cpp}`: cell state `1` is "newly
//! alive", state `0` is "dead", and states `2..num_states-1` are a decay
//! chain a cell passes through on its way back to dead after it fails to
//! survive. Only states `0` and `1` ever consult the lookup table; anything
//! mid-decay just counts up until it reaches the top state and dies.
//!
//! The lookup table (`rule3x3`) is a 512-entry truth table indexed by the
//! full 9-bit neighborhood (weights `nw=256,n=128,ne=64,w=32,c=16,e=8,
//! sw=4,s=2,se=1`), built either from a totalistic neighbor count, from an
//! isotropic non-totalistic letter (`ceaiknjqrytwz`, each one representative
//! neighborhood expanded to its full 8-fold rotation/reflection orbit), or
//! decoded directly from a `MAP` base64 payload.

use crate::error::{EngineError, EngineResult};
use crate::rule::Rule;

const DEFAULT_RULE: &str = "12/34/3";

const MOORE: u32 = 0x1ff;
const HEXAGONAL: u32 = 0x1bb;
const VON_NEUMANN: u32 = 0x0ba;

const SURVIVAL_OFFSET: u32 = 9;
const NEGATIVE_BIT: u16 = 13;

/// Canonical letter order, indexed by the letter bit position used
/// throughout `letter_bits`/`rule_neighborhoods`.
const RULE_LETTERS_13: &str = "ceaiknjqrytwz";
const BASE64_CHARS: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

// One representative 9-bit neighborhood pattern per letter, per neighbor
// count class (1/7 neighbors, 2/6, 3/5, 4). Neighbor counts above 4 reflect
// into the same class via an XOR mask in `rule_neighborhoods`.
const ENTRY0: [i32; 2] = [1, 2];
const ENTRY1: [i32; 6] = [5, 10, 3, 40, 33, 68];
const ENTRY2: [i32; 10] = [69, 42, 11, 7, 98, 13, 14, 70, 41, 97];
const ENTRY3: [i32; 13] = [325, 170, 15, 45, 99, 71, 106, 102, 43, 101, 105, 78, 108];

fn rule_neighborhoods(nindex: usize) -> &'static [i32] {
    match nindex {
        0 => &ENTRY0,
        1 => &ENTRY1,
        2 => &ENTRY2,
        3 => &ENTRY3,
        _ => unreachable!("nindex out of range"),
    }
}

const ORDER0: [u8; 1] = [0];
const ORDER1: [u8; 2] = [0, 1];
const ORDER2: [u8; 6] = [2, 0, 1, 3, 4, 5];
const ORDER3: [u8; 10] = [2, 0, 1, 3, 6, 4, 5, 7, 8, 9];
const ORDER4: [u8; 13] = [2, 0, 1, 3, 6, 4, 5, 7, 8, 10, 11, 9, 12];
const MAX_LETTERS9: [usize; 9] = [0, 2, 6, 10, 13, 10, 6, 2, 0];

/// Canonical letter output order for a given neighbor count (0..=17,
/// mirrored every 9 entries between birth and survival).
fn order_letters(idx: usize) -> &'static [u8] {
    match idx % 9 {
        0 => &ORDER0,
        1 => &ORDER1,
        2 => &ORDER2,
        3 => &ORDER3,
        4 => &ORDER4,
        5 => &ORDER3,
        6 => &ORDER2,
        7 => &ORDER1,
        8 => &ORDER0,
        _ => unreachable!(),
    }
}

fn max_letters(idx: usize) -> usize {
    MAX_LETTERS9[idx % 9]
}

fn flip_bits(x: i32) -> i32 {
    ((x & 0x07) << 6) | ((x & 0x1c0) >> 6) | (x & 0x38)
}

fn rotate_bits_90_clockwise(x: i32) -> i32 {
    ((x & 0x4) << 6)
        | ((x & 0x20) << 2)
        | ((x & 0x100) >> 2)
        | ((x & 0x2) << 4)
        | (x & 0x10)
        | ((x & 0x80) >> 4)
        | ((x & 0x1) << 2)
        | ((x & 0x8) >> 2)
        | ((x & 0x40) >> 6)
}

/// Writes `b` into every one of the 8 symmetric positions (4 rotations,
/// a flip, then 4 more rotations) that `x`'s orbit covers.
fn set_symmetrical_512(rule3x3: &mut [bool; 512], x: i32, b: bool) {
    let mut y = x;
    for _ in 0..4 {
        rule3x3[y as usize] = b;
        y = rotate_bits_90_clockwise(y);
    }
    y = flip_bits(y);
    for _ in 0..4 {
        rule3x3[y as usize] = b;
        y = rotate_bits_90_clockwise(y);
    }
}

pub struct Generations {
    states: u32,
    neighbormask: u32,
    neighbors: u32,
    totalistic: bool,
    using_map: bool,
    map_base64: String,
    rule3x3: [bool; 512],
    rulebits: u32,
    letter_bits: [u16; 18],
    rule_string: String,
}

impl Generations {
    pub fn new() -> Self {
        let mut r = Self {
            states: 3,
            neighbormask: MOORE,
            neighbors: 8,
            totalistic: true,
            using_map: false,
            map_base64: String::new(),
            rule3x3: [false; 512],
            rulebits: 0,
            letter_bits: [0; 18],
            rule_string: String::new(),
        };
        r.set_rule(DEFAULT_RULE).expect("default rule must parse");
        r
    }

    fn set_totalistic(&mut self, value: u32, survival: bool) {
        let offset = if survival { SURVIVAL_OFFSET } else { 0 };
        if self.rulebits & (1 << (value + offset)) != 0 {
            return;
        }
        self.rulebits |= 1 << (value + offset);
        let mask: u32 = if survival { 0x10 } else { 0 };
        // `n` ranges over every 9-bit index with the center bit (0x10)
        // clear; inserting a 0 at bit 4 turns it into that full index.
        for n in 0u32..256 {
            let base = ((n & !0xF) << 1) | (n & 0xF);
            let nhood = base & self.neighbormask;
            if nhood.count_ones() == value {
                self.rule3x3[(base + mask) as usize] = true;
            }
        }
    }

    fn set_symmetrical(&mut self, value: u32, survival: bool, lindex: usize, normal: bool) {
        if value == 0 || value == 8 {
            self.set_totalistic(value, survival);
            return;
        }
        let mut nindex = value as i32 - 1;
        let offset = if survival { SURVIVAL_OFFSET } else { 0 };
        self.rulebits |= 1 << (value + offset);

        let mut xorbit = 0i32;
        if nindex > 3 {
            nindex = 6 - nindex;
            xorbit = 0x1ef;
        }

        let count_idx = (value + offset) as usize;
        self.letter_bits[count_idx] |= 1 << lindex;
        if !normal {
            self.letter_bits[count_idx] |= 1 << NEGATIVE_BIT;
        }

        let table = rule_neighborhoods(nindex as usize);
        let mut x = table[lindex] ^ xorbit;
        if survival {
            x |= 0x10;
        }
        set_symmetrical_512(&mut self.rule3x3, x, normal);
    }

    /// Parses one birth or survival part (a run of `digit[-]letters*`
    /// groups) and folds it into `rule3x3`/`rulebits`/`letter_bits`.
    fn apply_part(&mut self, part: &str, survival: bool) -> EngineResult<()> {
        let chars: Vec<char> = part.chars().collect();
        let mut i = 0;
        while i < chars.len() {
            let d = chars[i].to_digit(10).filter(|&d| d <= 8).ok_or_else(|| {
                EngineError::InvalidRule(format!("expected a digit 0-8, found {:?}", chars[i]))
            })?;
            if !survival && d == 0 {
                return Err(EngineError::InvalidRule(
                    "a birth on zero neighbors is not supported".to_string(),
                ));
            }
            if d > self.neighbors {
                return Err(EngineError::InvalidRule(format!(
                    "digit {} greater than the {}-neighbor neighborhood allows",
                    d, self.neighbors
                )));
            }
            i += 1;

            let mut normal = true;
            let mut saw_dash = false;
            if i < chars.len() && chars[i] == '-' {
                normal = false;
                saw_dash = true;
                i += 1;
            }

            let mut saw_letter = false;
            while i < chars.len() {
                match RULE_LETTERS_13.find(chars[i]) {
                    Some(lindex) => {
                        self.set_symmetrical(d, survival, lindex, normal);
                        saw_letter = true;
                        i += 1;
                    }
                    None => break,
                }
            }

            if saw_letter {
                self.totalistic = false;
            } else if !saw_dash {
                self.set_totalistic(d, survival);
            }
        }
        Ok(())
    }

    fn set_rule_map(&mut self, rest: &str) -> EngineResult<()> {
        let last_slash = rest.rfind('/').ok_or_else(|| {
            EngineError::InvalidRule("Generations rule needs number of states.".to_string())
        })?;
        let mut maplen = last_slash;
        let base64_part = &rest[..last_slash];
        if maplen > 2 && base64_part.ends_with("==") {
            maplen -= 2;
        }
        let trimmed_base64 = &base64_part[..maplen];
        let (neighbormask, neighbors) = match maplen {
            86 => (MOORE, 8u32),
            22 => (HEXAGONAL, 6u32),
            6 => (VON_NEUMANN, 4u32),
            _ => {
                return Err(EngineError::InvalidRule(
                    "MAP rule needs 6, 22 or 86 base64 characters.".to_string(),
                ))
            }
        };
        for ch in trimmed_base64.chars() {
            if !BASE64_CHARS.contains(ch) {
                return Err(EngineError::InvalidRule(
                    "MAP contains illegal base64 character.".to_string(),
                ));
            }
        }

        let states_str = &rest[last_slash + 1..];
        let states: u32 = states_str.parse().map_err(|_| {
            EngineError::InvalidRule("Generations rule needs number of states.".to_string())
        })?;
        if !(2..=256).contains(&states) {
            return Err(EngineError::InvalidRule(format!(
                "state count {} out of range 2-256",
                states
            )));
        }

        self.neighbormask = neighbormask;
        self.neighbors = neighbors;
        self.totalistic = true;
        self.using_map = true;
        self.states = states;
        self.map_base64 = trimmed_base64.to_string();
        self.rulebits = 0;
        self.letter_bits = [0; 18];
        self.build_rule3x3_from_map(trimmed_base64);
        self.rule_string = self.canonical_name();
        Ok(())
    }

    /// Decodes a base64 MAP payload into `rule3x3`, remapping each decoded
    /// bit from the declared neighborhood's compact bit order into the
    /// full 9-bit index.
    fn build_rule3x3_from_map(&mut self, base64: &str) {
        let power2 = 1u32 << (self.neighbors + 1);
        let fullchars = (power2 / 6) as usize;
        let remainbits = power2 % 6;

        let mut bits = [0u8; 512];
        let mut chars = base64.chars();
        let mut j = 0usize;
        for _ in 0..fullchars {
            let ch = chars.next().unwrap_or('A');
            let c = BASE64_CHARS.find(ch).unwrap_or(0) as u8;
            for shift in (0..6).rev() {
                bits[j] = (c >> shift) & 1;
                j += 1;
            }
        }
        if remainbits > 0 {
            let ch = chars.next().unwrap_or('A');
            let c = BASE64_CHARS.find(ch).unwrap_or(0) as u8;
            let mut b = 5i32;
            for _ in 0..remainbits {
                bits[j] = ((c as i32) >> b) as u8 & 1;
                b -= 1;
                j += 1;
            }
        }

        let mut rule3x3 = [false; 512];
        for i in 0u32..512 {
            let mut k: i32 = 0;
            let mut m = self.neighbors as i32;
            for jb in (0..=8i32).rev() {
                if self.neighbormask & (1 << jb) != 0 {
                    if i & (1 << jb) != 0 {
                        k |= 1 << m;
                    }
                    m -= 1;
                }
            }
            rule3x3[i as usize] = bits[k as usize] != 0;
        }
        self.rule3x3 = rule3x3;
    }

    /// Builds the letter suffix for one neighbor count. Returns `None` when
    /// the count should be dropped entirely (an inverted, now-empty letter
    /// set), `Some("")` for a plain totalistic digit, or `Some(letters)`.
    fn letters_suffix(&self, idx: usize) -> Option<String> {
        let bits_raw = self.letter_bits[idx];
        if bits_raw == 0 {
            return Some(String::new());
        }
        let mut bits = bits_raw;
        let mut negative = bits & (1 << NEGATIVE_BIT) != 0;
        if negative {
            bits &= !(1u16 << NEGATIVE_BIT);
        }
        let setbits = bits.count_ones() as usize;
        let maxbits = max_letters(idx);

        if !(!negative && setbits == 7 && maxbits == 13) && setbits + (negative as usize) > maxbits / 2 {
            let inv = (!bits) & (((1u16) << maxbits) - 1);
            bits = inv;
            if inv != 0 {
                negative = !negative;
            }
        }

        if negative && bits == 0 {
            return None;
        }

        let mut s = String::new();
        if negative {
            s.push('-');
        }
        let letters = RULE_LETTERS_13.as_bytes();
        for &letter in order_letters(idx) {
            if bits & (1 << letter) != 0 {
                s.push(letters[letter as usize] as char);
            }
        }
        Some(s)
    }

    /// Builds the canonical rule string from the internal table state:
    /// survival digits, `/`, birth digits, `/`, state count, with any
    /// non-totalistic letters and the `H`/`V` neighborhood suffix.
    fn canonical_name(&self) -> String {
        if self.using_map {
            return format!("MAP{}/{}", self.map_base64, self.states);
        }

        let mut out = String::new();
        for i in 0..=self.neighbors {
            let idx = (SURVIVAL_OFFSET + i) as usize;
            if self.rulebits & (1 << idx) != 0 {
                out.push_str(&i.to_string());
                if !self.totalistic {
                    match self.letters_suffix(idx) {
                        Some(s) => out.push_str(&s),
                        None => {
                            out.pop();
                        }
                    }
                }
            }
        }
        out.push('/');
        for i in 0..=self.neighbors {
            let idx = i as usize;
            if self.rulebits & (1 << idx) != 0 {
                out.push_str(&i.to_string());
                if !self.totalistic {
                    match self.letters_suffix(idx) {
                        Some(s) => out.push_str(&s),
                        None => {
                            out.pop();
                        }
                    }
                }
            }
        }
        out.push('/');
        out.push_str(&self.states.to_string());
        if self.neighbormask == HEXAGONAL {
            out.push('H');
        } else if self.neighbormask == VON_NEUMANN {
            out.push('V');
        }
        out
    }
}

impl Default for Generations {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for Generations {
    fn num_cell_states(&self) -> u32 {
        self.states
    }

    fn default_rule(&self) -> &str {
        DEFAULT_RULE
    }

    fn set_rule(&mut self, rule_string: &str) -> EngineResult<()> {
        let body = rule_string.split(':').next().unwrap_or(rule_string);
        let compact: String = body.chars().filter(|c| !c.is_whitespace()).collect();
        if compact.len() >= 3 && compact[..3].eq_ignore_ascii_case("map") {
            return self.set_rule_map(&compact[3..]);
        }

        self.neighbormask = MOORE;
        self.neighbors = 8;
        self.totalistic = true;
        self.using_map = false;
        self.map_base64.clear();
        self.rule3x3 = [false; 512];
        self.rulebits = 0;
        self.letter_bits = [0; 18];

        let mut lower = compact.to_ascii_lowercase();
        if let Some(last) = lower.chars().last() {
            if last == 'h' || last == 'v' {
                lower.pop();
                if last == 'h' {
                    self.neighbormask = HEXAGONAL;
                    self.neighbors = 6;
                } else {
                    self.neighbormask = VON_NEUMANN;
                    self.neighbors = 4;
                }
            }
        }

        let parts: Vec<&str> = lower.split('/').collect();
        if parts.len() != 2 && parts.len() != 3 {
            return Err(EngineError::InvalidRule(format!(
                "rule must contain two slashes: {:?}",
                rule_string
            )));
        }
        let has_b0 = parts[0].starts_with('b');
        let has_s0 = parts[0].starts_with('s');
        let has_b1 = parts.get(1).map_or(false, |p| p.starts_with('b'));
        let has_s1 = parts.get(1).map_or(false, |p| p.starts_with('s'));

        let (survival_raw, birth_raw, states_part) = if has_b0 || has_s0 || has_b1 || has_s1 {
            if has_b0 && has_s1 {
                (&parts[1][1..], &parts[0][1..], parts.get(2).copied())
            } else if has_s0 && has_b1 {
                (&parts[0][1..], &parts[1][1..], parts.get(2).copied())
            } else {
                return Err(EngineError::InvalidRule(format!(
                    "B and S must be either side of slash: {:?}",
                    rule_string
                )));
            }
        } else {
            if parts.len() != 3 {
                return Err(EngineError::InvalidRule(format!(
                    "rule must contain two slashes: {:?}",
                    rule_string
                )));
            }
            (parts[0], parts[1], Some(parts[2]))
        };

        let states: u32 = match states_part {
            Some(s) => {
                let s = s.strip_prefix('c').unwrap_or(s);
                s.parse()
                    .map_err(|_| EngineError::InvalidRule(rule_string.to_string()))?
            }
            None => 2,
        };
        if !(2..=256).contains(&states) {
            return Err(EngineError::InvalidRule(format!(
                "state count {} out of range 2-256",
                states
            )));
        }
        self.states = states;

        self.apply_part(birth_raw, false)?;
        self.apply_part(survival_raw, true)?;

        self.rule_string = self.canonical_name();
        Ok(())
    }

    fn get_rule(&self) -> String {
        self.rule_string.clone()
    }

    fn transition(
        &self,
        nw: u8,
        n: u8,
        ne: u8,
        w: u8,
        c: u8,
        e: u8,
        sw: u8,
        s: u8,
        se: u8,
    ) -> u8 {
        let bit = |v: u8, weight: usize| if v == 1 { weight } else { 0 };
        let index = bit(nw, 256)
            | bit(n, 128)
            | bit(ne, 64)
            | bit(w, 32)
            | bit(c, 16)
            | bit(e, 8)
            | bit(sw, 4)
            | bit(s, 2)
            | bit(se, 1);
        if c <= 1 && self.rule3x3[index] {
            1
        } else if c > 0 && (c as u32 + 1) < self.states {
            c + 1
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bs_form_and_canonicalizes() {
        let mut r = Generations::new();
        r.set_rule("B3/S23").unwrap();
        assert_eq!(r.num_cell_states(), 2);
        assert_eq!(r.get_rule(), "23/3/2");
    }

    #[test]
    fn parses_numeric_form() {
        let mut r = Generations::new();
        r.set_rule("23/3/3").unwrap();
        assert_eq!(r.get_rule(), "23/3/3");
    }

    #[test]
    fn seed_rule_canonicalizes_without_bs_prefixes() {
        // The spec's literal seed case: survival first, then birth, then
        // state count, with no B/S/C letters at all.
        let mut r = Generations::new();
        r.set_rule("12/34/3").unwrap();
        assert_eq!(r.get_rule(), "12/34/3");
        assert_eq!(r.num_cell_states(), 3);
    }

    #[test]
    fn rejects_garbage_and_out_of_range_counts() {
        let mut r = Generations::new();
        assert!(r.set_rule("B9/S23").is_err());
        assert!(r.set_rule("not a rule").is_err());
        assert!(r.set_rule("B3/S23/C1").is_err());
        assert!(r.set_rule("B0/S23/C2").is_err());
    }

    #[test]
    fn digit_exceeding_the_neighborhood_is_rejected() {
        let mut r = Generations::new();
        assert!(r.set_rule("B5/S23/C2V").is_err());
    }

    #[test]
    fn life_transition_matches_b3s23() {
        let mut r = Generations::new();
        r.set_rule("B3/S23/C2").unwrap();
        // Three live neighbors birth a dead cell.
        assert_eq!(r.transition(1, 1, 1, 0, 0, 0, 0, 0, 0), 1);
        // A live cell with two neighbors survives.
        assert_eq!(r.transition(1, 1, 0, 0, 1, 0, 0, 0, 0), 1);
        // A live cell with one neighbor dies.
        assert_eq!(r.transition(1, 0, 0, 0, 1, 0, 0, 0, 0), 0);
    }

    #[test]
    fn decaying_states_count_up_without_consulting_the_table() {
        let mut r = Generations::new();
        r.set_rule("B3/S23/C5").unwrap();
        // A mid-decay cell always advances to the next state regardless of
        // its neighborhood, until it reaches the top state and dies.
        assert_eq!(r.transition(0, 0, 0, 0, 2, 0, 0, 0, 0), 3);
        assert_eq!(r.transition(1, 1, 1, 1, 4, 1, 1, 1, 1), 0);
    }

    #[test]
    fn full_letter_set_collapses_to_plain_totalistic_digit() {
        // Specifying every letter for a neighbor count is equivalent to the
        // bare totalistic digit, and the canonical form drops the letters.
        let mut r = Generations::new();
        r.set_rule("23/3ceaiknjqry/2").unwrap();
        assert_eq!(r.get_rule(), "23/3/2");
    }

    #[test]
    fn non_totalistic_letter_rule_round_trips() {
        let mut r = Generations::new();
        r.set_rule("23/2c/2").unwrap();
        assert_eq!(r.get_rule(), "23/2c/2");
    }

    #[test]
    fn hex_neighborhood_suffix_round_trips() {
        let mut r = Generations::new();
        r.set_rule("23/3/3H").unwrap();
        assert_eq!(r.get_rule(), "23/3/3H");
    }

    #[test]
    fn map_rule_parses_and_round_trips() {
        let mut r = Generations::new();
        r.set_rule("MAPAAAAAA/3").unwrap();
        assert_eq!(r.get_rule(), "MAPAAAAAA/3");
        assert_eq!(r.num_cell_states(), 3);
        // The all-zero table never births or sustains a cell.
        assert_eq!(r.transition(1, 1, 1, 1, 0, 1, 1, 1, 1), 0);
        // A live cell always decays toward death under the empty table.
        assert_eq!(r.transition(0, 0, 0, 0, 1, 0, 0, 0, 0), 2);
    }

    #[test]
    fn rejects_bad_map_payload_lengths() {
        let mut r = Generations::new();
        assert!(r.set_rule("MAPAA/3").is_err());
        assert!(r.set_rule("MAPAAAAAA").is_err());
    }
}
