//! RuleTable: Golly's `.table` format -- an author writes one representative
//! transition per symmetry class over a chosen neighborhood, plus bound
//! `var` variables that expand a single line into many concrete rules, and
//! the loader expands all of it into a compressed lookup table.
//!
//! Grounded on `gollybase/ruletable_algo.cpp`: each neighborhood position
//! gets its own bitmap indexed by `(state, compressed rule word)`; evaluating
//! a neighborhood ANDs the bitmaps for the actual state at each position and
//! the lowest set bit names the winning rule. A neighborhood position that
//! the declared neighborhood doesn't use (e.g. the diagonals under
//! `vonNeumann`) is "don't care" and is packed as matching every state.
//!
//! The symmetry groups (`rotate4`, `rotate8reflect`, `permute`, ...) are
//! generated here from the neighborhood's clockwise adjacency order rather
//! than Golly's literal per-symmetry remap tables -- see DESIGN.md.

use std::collections::{HashMap, HashSet};

use itertools::Itertools;

use crate::error::{EngineError, EngineResult};
use crate::rule::Rule;

/// Position indices into the fixed 9-slot neighborhood array
/// `[nw, n, ne, w, c, e, sw, s, se]`, matching [`Rule::transition`]'s
/// parameter order.
mod pos {
    pub const NW: usize = 0;
    pub const N: usize = 1;
    pub const NE: usize = 2;
    pub const W: usize = 3;
    pub const C: usize = 4;
    pub const E: usize = 5;
    pub const SW: usize = 6;
    pub const S: usize = 7;
    pub const SE: usize = 8;
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Neighborhood {
    VonNeumann,
    Moore,
    Hexagonal,
    OneDimensional,
}

impl Neighborhood {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "vonNeumann" => Some(Neighborhood::VonNeumann),
            "Moore" => Some(Neighborhood::Moore),
            "hexagonal" => Some(Neighborhood::Hexagonal),
            "oneDimensional" => Some(Neighborhood::OneDimensional),
            _ => None,
        }
    }

    /// Token order for this neighborhood's transition lines: center first,
    /// then the clockwise neighbor cycle.
    fn token_order(self) -> Vec<usize> {
        use pos::*;
        match self {
            Neighborhood::VonNeumann => vec![C, N, E, S, W],
            Neighborhood::Moore => vec![C, N, NE, E, SE, S, SW, W, NW],
            Neighborhood::Hexagonal => vec![C, N, NE, E, S, SW, W],
            Neighborhood::OneDimensional => vec![C, E, W],
        }
    }

    fn n_inputs(self) -> usize {
        self.token_order().len()
    }

    fn cycle_len(self) -> usize {
        self.n_inputs() - 1
    }
}

#[derive(Clone, Copy)]
enum Symmetry {
    None,
    ReflectHorizontal,
    RotateN(usize),
    RotateNReflect(usize),
    Permute,
}

fn parse_symmetry(s: &str, nb: Neighborhood) -> Option<Symmetry> {
    use Neighborhood::*;
    match (nb, s) {
        (_, "none") => Some(Symmetry::None),
        (_, "permute") => Some(Symmetry::Permute),
        (VonNeumann, "rotate4") => Some(Symmetry::RotateN(4)),
        (VonNeumann, "rotate4reflect") => Some(Symmetry::RotateNReflect(4)),
        (VonNeumann, "reflect_horizontal") => Some(Symmetry::ReflectHorizontal),
        (Moore, "rotate4") => Some(Symmetry::RotateN(4)),
        (Moore, "rotate8") => Some(Symmetry::RotateN(8)),
        (Moore, "rotate4reflect") => Some(Symmetry::RotateNReflect(4)),
        (Moore, "rotate8reflect") => Some(Symmetry::RotateNReflect(8)),
        (Moore, "reflect_horizontal") => Some(Symmetry::ReflectHorizontal),
        (Hexagonal, "rotate2") => Some(Symmetry::RotateN(2)),
        (Hexagonal, "rotate3") => Some(Symmetry::RotateN(3)),
        (Hexagonal, "rotate6") => Some(Symmetry::RotateN(6)),
        (Hexagonal, "rotate6reflect") => Some(Symmetry::RotateNReflect(6)),
        (OneDimensional, "reflect") => Some(Symmetry::ReflectHorizontal),
        _ => None,
    }
}

fn rotations(values: &[u8], cycle_len: usize, step: usize) -> Vec<Vec<u8>> {
    let mut out = Vec::new();
    let mut s = 0;
    while s < cycle_len {
        let mut v = Vec::with_capacity(values.len());
        v.push(values[0]);
        for j in 0..cycle_len {
            v.push(values[1 + (j + s) % cycle_len]);
        }
        out.push(v);
        s += step;
    }
    out
}

fn reflect(values: &[u8], cycle_len: usize) -> Vec<u8> {
    let mut v = Vec::with_capacity(values.len());
    v.push(values[0]);
    for j in 0..cycle_len {
        v.push(values[1 + (cycle_len - j) % cycle_len]);
    }
    v
}

/// Expands one concrete transition (ordered per [`Neighborhood::token_order`])
/// into every variant its symmetry group produces.
fn symmetry_variants(cycle_len: usize, symmetry: Symmetry, values: &[u8]) -> Vec<Vec<u8>> {
    match symmetry {
        Symmetry::None => vec![values.to_vec()],
        Symmetry::ReflectHorizontal => vec![values.to_vec(), reflect(values, cycle_len)],
        Symmetry::RotateN(n) => rotations(values, cycle_len, cycle_len / n),
        Symmetry::RotateNReflect(n) => {
            let mut out = rotations(values, cycle_len, cycle_len / n);
            let reflected = reflect(values, cycle_len);
            out.extend(rotations(&reflected, cycle_len, cycle_len / n));
            out
        }
        Symmetry::Permute => values[1..]
            .iter()
            .copied()
            .permutations(cycle_len)
            .map(|p| {
                let mut v = Vec::with_capacity(values.len());
                v.push(values[0]);
                v.extend(p);
                v
            })
            .collect(),
    }
}

fn parse_var_line(rest: &str) -> Option<(String, Vec<u32>)> {
    let (name, values) = rest.split_once('=')?;
    let name = name.trim().to_string();
    let values = values.trim().trim_start_matches('{').trim_end_matches('}');
    let values: Result<Vec<u32>, _> = values.split(',').map(|v| v.trim().parse()).collect();
    values.ok().map(|v| (name, v))
}

enum Slot {
    Literal(u8),
    Var(String),
}

/// Parses one transition line (comma-free digit string, or comma-separated
/// literals/variables) into every concrete `(inputs, output)` tuple it
/// expands to, in token order.
fn parse_transition_line(
    line: &str,
    n_inputs: usize,
    states: u32,
    vars: &HashMap<String, Vec<u32>>,
) -> Result<Vec<(Vec<u8>, u8)>, String> {
    if !line.contains(',') {
        let chars: Vec<char> = line.chars().collect();
        if chars.len() != n_inputs + 1 {
            return Err(format!(
                "expected {} digits, found {}",
                n_inputs + 1,
                chars.len()
            ));
        }
        if states > 10 {
            return Err("the comma-free form requires fewer than 10 states".to_string());
        }
        let mut vals = Vec::with_capacity(n_inputs + 1);
        for c in &chars {
            let d = c.to_digit(10).ok_or_else(|| "expected a digit".to_string())?;
            vals.push(d as u8);
        }
        let output = vals.pop().unwrap();
        return Ok(vec![(vals, output)]);
    }

    let tokens: Vec<&str> = line.split(',').map(|t| t.trim()).collect();
    if tokens.len() != n_inputs + 1 {
        return Err(format!(
            "expected {} comma-separated fields, found {}",
            n_inputs + 1,
            tokens.len()
        ));
    }

    let mut slots = Vec::with_capacity(tokens.len());
    let mut dims: Vec<(String, Vec<u32>)> = Vec::new();
    for t in &tokens {
        if let Ok(v) = t.parse::<u8>() {
            slots.push(Slot::Literal(v));
        } else {
            let values = vars
                .get(*t)
                .ok_or_else(|| format!("unknown variable {:?}", t))?;
            slots.push(Slot::Var((*t).to_string()));
            if !dims.iter().any(|(n, _)| n.as_str() == *t) {
                dims.push(((*t).to_string(), values.clone()));
            }
        }
    }

    let mut results = Vec::new();
    let mut combo = vec![0usize; dims.len()];
    loop {
        let assignment: HashMap<&str, u32> = dims
            .iter()
            .zip(combo.iter())
            .map(|((n, vals), i)| (n.as_str(), vals[*i]))
            .collect();
        let mut vals = Vec::with_capacity(tokens.len());
        for slot in &slots {
            match slot {
                Slot::Literal(v) => vals.push(*v),
                Slot::Var(name) => vals.push(assignment[name.as_str()] as u8),
            }
        }
        let output = vals.pop().unwrap();
        results.push((vals, output));

        if dims.is_empty() {
            return Ok(results);
        }
        let mut i = 0;
        loop {
            if i == dims.len() {
                return Ok(results);
            }
            combo[i] += 1;
            if combo[i] < dims[i].1.len() {
                break;
            }
            combo[i] = 0;
            i += 1;
        }
    }
}

/// A bitmap LUT: for each of the 9 neighborhood positions and each possible
/// state, which rule words have that state at that position. Evaluation ANDs
/// the 9 bitmaps for a concrete neighborhood and takes the lowest set bit.
struct LutTable {
    lut: [Vec<Vec<u64>>; 9],
    output: Vec<u8>,
}

impl LutTable {
    fn new(states: usize) -> Self {
        let per_position = || (0..states).map(|_| Vec::new()).collect();
        Self {
            lut: [
                per_position(),
                per_position(),
                per_position(),
                per_position(),
                per_position(),
                per_position(),
                per_position(),
                per_position(),
                per_position(),
            ],
            output: Vec::new(),
        }
    }

    fn set_bit(&mut self, position: usize, state: usize, word: usize, bit: usize) {
        let v = &mut self.lut[position][state];
        if v.len() <= word {
            v.resize(word + 1, 0);
        }
        v[word] |= 1u64 << bit;
    }

    fn pack(&mut self, active: &[usize], variant: &[u8], output: u8, states: usize) {
        let rule_index = self.output.len();
        self.output.push(output);
        let word = rule_index / 64;
        let bit = rule_index % 64;
        for position in 0..9 {
            match active.iter().position(|&p| p == position) {
                Some(slot) => self.set_bit(position, variant[slot] as usize, word, bit),
                None => {
                    for state in 0..states {
                        self.set_bit(position, state, word, bit);
                    }
                }
            }
        }
    }

    fn evaluate(&self, inputs: [u8; 9], default_center: u8) -> u8 {
        let n_words = (self.output.len() + 63) / 64;
        for word in 0..n_words {
            let mut acc = !0u64;
            for position in 0..9 {
                let state = inputs[position] as usize;
                let bits = self.lut[position]
                    .get(state)
                    .and_then(|w| w.get(word))
                    .copied()
                    .unwrap_or(0);
                acc &= bits;
                if acc == 0 {
                    break;
                }
            }
            if acc != 0 {
                let rule_index = word * 64 + acc.trailing_zeros() as usize;
                return self.output[rule_index];
            }
        }
        default_center
    }
}

pub struct RuleTable {
    states: u32,
    rule_name: String,
    table: LutTable,
}

impl RuleTable {
    pub fn new() -> Self {
        Self {
            states: 2,
            rule_name: String::new(),
            table: LutTable::new(2),
        }
    }

    /// Loads a table from Golly's `.table` grammar: `n_states:`,
    /// `neighborhood:`, `symmetries:`, `var name = {...}` bindings, and
    /// transition lines (either a comma-free digit string, or
    /// comma-separated literals/variable names).
    pub fn load_from_str(&mut self, rule_name: &str, text: &str) -> EngineResult<()> {
        let mut states = None;
        let mut neighborhood = None;
        let mut symmetry = None;
        let mut vars: HashMap<String, Vec<u32>> = HashMap::new();
        let mut raw_lines: Vec<(usize, String)> = Vec::new();

        for (lineno, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
                continue;
            }
            if let Some(rest) = line.strip_prefix("n_states:") {
                states = Some(rest.trim().parse::<u32>().map_err(|_| {
                    EngineError::MacrocellParse {
                        line: lineno + 1,
                        message: "expected an integer after `n_states:`".to_string(),
                    }
                })?);
                continue;
            }
            if let Some(rest) = line.strip_prefix("neighborhood:") {
                neighborhood = Some(Neighborhood::parse(rest.trim()).ok_or_else(|| {
                    EngineError::MacrocellParse {
                        line: lineno + 1,
                        message: format!("unknown neighborhood {:?}", rest.trim()),
                    }
                })?);
                continue;
            }
            if let Some(rest) = line.strip_prefix("symmetries:") {
                let nb = neighborhood.ok_or_else(|| EngineError::MacrocellParse {
                    line: lineno + 1,
                    message: "`symmetries:` requires `neighborhood:` first".to_string(),
                })?;
                symmetry = Some(parse_symmetry(rest.trim(), nb).ok_or_else(|| {
                    EngineError::MacrocellParse {
                        line: lineno + 1,
                        message: format!(
                            "unknown or unsupported symmetry {:?} for this neighborhood",
                            rest.trim()
                        ),
                    }
                })?);
                continue;
            }
            if let Some(rest) = line.strip_prefix("var ") {
                let (name, values) = parse_var_line(rest).ok_or_else(|| {
                    EngineError::MacrocellParse {
                        line: lineno + 1,
                        message: "malformed `var` line".to_string(),
                    }
                })?;
                vars.insert(name, values);
                continue;
            }
            raw_lines.push((lineno, line.to_string()));
        }

        let states = states.ok_or_else(|| EngineError::MacrocellParse {
            line: 0,
            message: "missing `n_states:`".to_string(),
        })?;
        let neighborhood = neighborhood.unwrap_or(Neighborhood::Moore);
        let symmetry = symmetry.unwrap_or(Symmetry::None);
        let n_inputs = neighborhood.n_inputs();
        let cycle_len = neighborhood.cycle_len();
        let active = neighborhood.token_order();

        let mut table = LutTable::new(states as usize);
        for (lineno, line) in raw_lines {
            let tuples = parse_transition_line(&line, n_inputs, states, &vars).map_err(|m| {
                EngineError::MacrocellParse {
                    line: lineno + 1,
                    message: m,
                }
            })?;
            for (inputs, output) in tuples {
                let mut seen = HashSet::new();
                for variant in symmetry_variants(cycle_len, symmetry, &inputs) {
                    if seen.insert(variant.clone()) {
                        table.pack(&active, &variant, output, states as usize);
                    }
                }
            }
        }

        self.states = states;
        self.rule_name = rule_name.to_string();
        self.table = table;
        Ok(())
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for RuleTable {
    fn num_cell_states(&self) -> u32 {
        self.states
    }

    fn default_rule(&self) -> &str {
        ""
    }

    fn set_rule(&mut self, rule_string: &str) -> EngineResult<()> {
        // A bare RuleTable instance has nothing to look up without a table
        // file; `RuleLoader` is responsible for locating and loading one.
        // Accept the name here so `get_rule` round-trips.
        self.rule_name = rule_string.to_string();
        Ok(())
    }

    fn get_rule(&self) -> String {
        self.rule_name.clone()
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
        self.table.evaluate([nw, n, ne, w, c, e, sw, s, se], c)
    }
}
