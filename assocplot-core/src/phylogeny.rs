//! Local phylogenies attached to association intervals
//!
//! A subtree's leaves carry one or more strain names and its internal nodes carry a
//! branch length. Every strain appears in exactly one leaf; [`PhylogenySubtree::new`]
//! enforces this. Trees round-trip through Newick text: strains sharing a leaf are
//! joined with `|` inside the leaf label, and labels containing Newick punctuation are
//! single-quoted.

use std::collections::HashSet;
use std::fmt;

use crate::error::{AssocError, AssocResult};

const STRAIN_SEPARATOR: char = '|';

/// Deepest nesting of internal nodes accepted when parsing or validating a tree
pub const MAX_NEWICK_DEPTH: usize = 1_000;

#[derive(Debug, Clone, PartialEq)]
pub enum PhyloNode {
    Leaf { strains: Vec<String> },
    Internal { branch_length: f64, children: Vec<PhyloNode> },
}

impl PhyloNode {
    pub fn leaf<I, S>(strains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        PhyloNode::Leaf {
            strains: strains.into_iter().map(Into::into).collect(),
        }
    }

    pub fn internal(branch_length: f64, children: Vec<PhyloNode>) -> Self {
        PhyloNode::Internal {
            branch_length,
            children,
        }
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a [String]>) {
        match self {
            PhyloNode::Leaf { strains } => out.push(strains),
            PhyloNode::Internal { children, .. } => {
                for child in children {
                    child.collect_leaves(out);
                }
            }
        }
    }

    fn write_newick(&self, out: &mut String) {
        match self {
            PhyloNode::Leaf { strains } => {
                out.push_str(&quote_label(&strains.join(&STRAIN_SEPARATOR.to_string())));
            }
            PhyloNode::Internal {
                branch_length,
                children,
            } => {
                out.push('(');
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    child.write_newick(out);
                }
                out.push(')');
                out.push_str(&format!(":{}", branch_length));
            }
        }
    }
}

/// A validated tree in which each strain sits on exactly one leaf
#[derive(Debug, Clone, PartialEq)]
pub struct PhylogenySubtree {
    root: PhyloNode,
}

impl PhylogenySubtree {
    pub fn new(root: PhyloNode) -> AssocResult<Self> {
        validate(&root, 0, &mut HashSet::new())?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &PhyloNode {
        &self.root
    }

    /// Leaf strain lists in depth-first, left-to-right order
    pub fn leaves(&self) -> Vec<&[String]> {
        let mut leaves = Vec::new();
        self.root.collect_leaves(&mut leaves);
        leaves
    }

    pub fn strain_count(&self) -> usize {
        self.leaves().iter().map(|leaf| leaf.len()).sum()
    }

    pub fn parse_newick(text: &str) -> AssocResult<Self> {
        let mut parser = NewickParser::new(text);
        let root = parser.parse_tree()?;
        Self::new(root)
    }

    pub fn to_newick(&self) -> String {
        let mut out = String::new();
        self.root.write_newick(&mut out);
        out.push(';');
        out
    }
}

impl fmt::Display for PhylogenySubtree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_newick())
    }
}

fn validate<'a>(node: &'a PhyloNode, depth: usize, seen: &mut HashSet<&'a str>) -> AssocResult<()> {
    match node {
        PhyloNode::Leaf { strains } => {
            if strains.is_empty() {
                return Err(AssocError::invalid_partition("phylogeny leaf without strains"));
            }
            for strain in strains {
                if !seen.insert(strain.as_str()) {
                    return Err(AssocError::invalid_partition(format!(
                        "strain '{}' appears in more than one phylogeny leaf",
                        strain
                    )));
                }
            }
        }
        PhyloNode::Internal {
            branch_length,
            children,
        } => {
            if children.is_empty() {
                return Err(AssocError::invalid_partition("internal phylogeny node without children"));
            }
            if depth >= MAX_NEWICK_DEPTH {
                return Err(AssocError::invalid_partition(format!(
                    "phylogeny nested deeper than {} levels",
                    MAX_NEWICK_DEPTH
                )));
            }
            if !branch_length.is_finite() {
                return Err(AssocError::invalid_partition(format!(
                    "non-finite branch length {}",
                    branch_length
                )));
            }
            for child in children {
                validate(child, depth + 1, seen)?;
            }
        }
    }
    Ok(())
}

fn needs_quotes(label: &str) -> bool {
    label
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, '(' | ')' | '[' | ']' | '\'' | ':' | ';' | ','))
}

fn quote_label(label: &str) -> String {
    if needs_quotes(label) {
        format!("'{}'", label.replace('\'', "''"))
    } else {
        label.to_string()
    }
}

struct NewickParser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> NewickParser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
    }

    fn expect(&mut self, expected: char) -> AssocResult<()> {
        self.skip_whitespace();
        match self.bump() {
            Some(c) if c == expected => Ok(()),
            Some(c) => Err(AssocError::newick(
                self.pos - c.len_utf8(),
                format!("expected '{}', found '{}'", expected, c),
            )),
            None => Err(AssocError::newick(
                self.pos,
                format!("expected '{}', found end of input", expected),
            )),
        }
    }

    fn parse_tree(&mut self) -> AssocResult<PhyloNode> {
        let root = self.parse_node(0)?;
        self.skip_whitespace();
        if self.peek() == Some(';') {
            self.bump();
        }
        self.skip_whitespace();
        if let Some(c) = self.peek() {
            return Err(AssocError::newick(
                self.pos,
                format!("unexpected '{}' after end of tree", c),
            ));
        }
        Ok(root)
    }

    fn parse_node(&mut self, depth: usize) -> AssocResult<PhyloNode> {
        self.skip_whitespace();
        if self.peek() == Some('(') {
            if depth >= MAX_NEWICK_DEPTH {
                return Err(AssocError::newick(
                    self.pos,
                    format!("tree nested deeper than {} levels", MAX_NEWICK_DEPTH),
                ));
            }
            self.bump();
            let mut children = vec![self.parse_node(depth + 1)?];
            loop {
                self.skip_whitespace();
                match self.peek() {
                    Some(',') => {
                        self.bump();
                        children.push(self.parse_node(depth + 1)?);
                    }
                    _ => break,
                }
            }
            self.expect(')')?;
            // internal node names carry no strains
            self.parse_label()?;
            let branch_length = self.parse_branch_length()?.unwrap_or(0.0);
            Ok(PhyloNode::internal(branch_length, children))
        } else {
            let start = self.pos;
            let label = self.parse_label()?;
            self.parse_branch_length()?;
            let strains: Vec<String> = label
                .split(STRAIN_SEPARATOR)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            if strains.is_empty() {
                return Err(AssocError::newick(start, "leaf without a strain label"));
            }
            Ok(PhyloNode::Leaf { strains })
        }
    }

    fn parse_label(&mut self) -> AssocResult<String> {
        self.skip_whitespace();
        if self.peek() == Some('\'') {
            let start = self.pos;
            self.bump();
            let mut label = String::new();
            loop {
                match self.bump() {
                    Some('\'') if self.peek() == Some('\'') => {
                        self.bump();
                        label.push('\'');
                    }
                    Some('\'') => return Ok(label),
                    Some(c) => label.push(c),
                    None => return Err(AssocError::newick(start, "unterminated quoted label")),
                }
            }
        }

        let start = self.pos;
        while let Some(c) = self.peek() {
            if matches!(c, '(' | ')' | ',' | ':' | ';') || c.is_whitespace() {
                break;
            }
            self.bump();
        }
        Ok(self.input[start..self.pos].to_string())
    }

    fn parse_branch_length(&mut self) -> AssocResult<Option<f64>> {
        self.skip_whitespace();
        if self.peek() != Some(':') {
            return Ok(None);
        }
        self.bump();
        self.skip_whitespace();
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E') {
                self.bump();
            } else {
                break;
            }
        }
        let text = &self.input[start..self.pos];
        text.parse::<f64>()
            .map(Some)
            .map_err(|_| AssocError::newick(start, format!("invalid branch length '{}'", text)))
    }
}
