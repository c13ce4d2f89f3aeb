//! Field handlers keyed by attribute
//!
//! A handler receives the value node of a field, the typed destination the attribute
//! resolves to, and the attribute itself. Handlers that need another network round trip
//! are registered as [`Handler::Secondary`] and run after the document is released.

use crate::document::Node;
use crate::extract::attribute::{Attribute, Slot};
use crate::extract::text::{collapse_whitespace, normalize, to_sentence_case};
use crate::record::{MoaRow, MolWeight};
use crate::{FieldError, FieldResult};
use std::collections::HashMap;
use std::fmt;

/// Synchronous handler operating on the parsed document
pub type FieldHandler = fn(Node<'_>, Slot<'_>, Attribute) -> FieldResult<()>;

/// How one attribute is extracted
#[derive(Clone, Copy)]
pub enum Handler {
    /// Runs immediately against the value node
    Inline(FieldHandler),

    /// Deferred until the document is dropped; needs a follow-up fetch
    Secondary,
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handler::Inline(_) => f.write_str("Inline"),
            Handler::Secondary => f.write_str("Secondary"),
        }
    }
}

/// Attribute → handler mapping
#[derive(Debug, Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<Attribute, Handler>,
}

impl HandlerRegistry {
    /// Creates an empty registry; every field falls through to default assignment
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the catalog's standard handlers
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry
            .register(Attribute::Synonyms, Handler::Inline(handle_list))
            .register(Attribute::Categories, Handler::Inline(handle_list))
            .register(Attribute::Groups, Handler::Inline(handle_list))
            .register(Attribute::Description, Handler::Inline(handle_description))
            .register(Attribute::Weight, Handler::Inline(handle_molecular_weight))
            .register(Attribute::Inchi, Handler::Inline(handle_identifier_pair))
            .register(Attribute::InchiKey, Handler::Inline(handle_identifier_pair))
            .register(Attribute::MechanismOfAction, Handler::Inline(handle_mechanism_of_action))
            .register(Attribute::DrugInteractions, Handler::Secondary);
        registry
    }

    /// Registers or replaces the handler for `attribute`
    pub fn register(&mut self, attribute: Attribute, handler: Handler) -> &mut Self {
        self.handlers.insert(attribute, handler);
        self
    }

    pub fn get(&self, attribute: Attribute) -> Option<Handler> {
        self.handlers.get(&attribute).copied()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

fn mismatch(attribute: Attribute, slot: &Slot<'_>) -> FieldError {
    FieldError::Mismatch {
        field: attribute.field_name(),
        slot: slot.kind(),
    }
}

fn select<'a>(node: Node<'a>, attribute: Attribute, css: &str) -> FieldResult<Vec<Node<'a>>> {
    node.select(css).map_err(|source| FieldError::Selector {
        field: attribute.field_name(),
        source,
    })
}

/// Appends the text of every list item
pub fn handle_list(node: Node<'_>, slot: Slot<'_>, attribute: Attribute) -> FieldResult<()> {
    let values = match slot {
        Slot::List(values) => values,
        other => return Err(mismatch(attribute, &other)),
    };

    values.extend(
        select(node, attribute, "li")?
            .iter()
            .map(|item| collapse_whitespace(&item.text())),
    );
    Ok(())
}

/// Assigns the text in sentence case
pub fn handle_description(node: Node<'_>, slot: Slot<'_>, attribute: Attribute) -> FieldResult<()> {
    let value = match slot {
        Slot::Scalar(value) => value,
        other => return Err(mismatch(attribute, &other)),
    };

    *value = to_sentence_case(&collapse_whitespace(&node.text()));
    Ok(())
}

/// Fills the hash or id half of the InChI pair, depending on the label
pub fn handle_identifier_pair(
    node: Node<'_>,
    slot: Slot<'_>,
    attribute: Attribute,
) -> FieldResult<()> {
    let pair = match slot {
        Slot::Inchi(pair) => pair,
        other => return Err(mismatch(attribute, &other)),
    };

    let text = collapse_whitespace(&node.text());
    match attribute {
        Attribute::InchiKey => pair.hash = text.to_uppercase(),
        Attribute::Inchi => pair.id = text,
        other => {
            return Err(FieldError::Handler {
                field: other.field_name(),
                message: "not half of an identifier pair".to_string(),
            })
        }
    }
    Ok(())
}

/// Builds one row per `tbody tr`: target, action, organism, then anything else
pub fn handle_mechanism_of_action(
    node: Node<'_>,
    slot: Slot<'_>,
    attribute: Attribute,
) -> FieldResult<()> {
    let rows = match slot {
        Slot::Moa(rows) => rows,
        other => return Err(mismatch(attribute, &other)),
    };

    let mut parsed = Vec::new();
    for tr in select(node, attribute, "tbody tr")? {
        let mut row = MoaRow::default();
        for (index, cell) in select(tr, attribute, "td")?.iter().enumerate() {
            let text = collapse_whitespace(&cell.text());
            match index {
                0 => row.target = text,
                1 => row.action = text,
                2 => row.organism = text,
                _ => row.unknown.push(text),
            }
        }
        parsed.push(row);
    }

    *rows = parsed;
    Ok(())
}

/// Appends the average and monoisotopic weights
///
/// On malformed input the weight list is left untouched.
pub fn handle_molecular_weight(
    node: Node<'_>,
    slot: Slot<'_>,
    attribute: Attribute,
) -> FieldResult<()> {
    let weights = match slot {
        Slot::Weights(weights) => weights,
        other => return Err(mismatch(attribute, &other)),
    };

    weights.extend(parse_molecular_weight(&node.text_spaced())?);
    Ok(())
}

/// Parses `"average <num> [da] monoisotopic <num> [da]"`
pub fn parse_molecular_weight(text: &str) -> FieldResult<[MolWeight; 2]> {
    let normalized = normalize(text);
    let malformed = || FieldError::Malformed {
        field: "weight",
        input: normalized.clone(),
    };

    let tokens: Vec<&str> = normalized
        .split_whitespace()
        .filter(|token| *token != "da")
        .collect();
    if tokens.len() != 4 {
        return Err(malformed());
    }

    let average: f64 = tokens[1].parse().map_err(|_| malformed())?;
    let monoisotopic: f64 = tokens[3].parse().map_err(|_| malformed())?;

    Ok([
        MolWeight {
            kind: "average".to_string(),
            value: average,
            unit: "Da".to_string(),
        },
        MolWeight {
            kind: "monoisotopic".to_string(),
            value: monoisotopic,
            unit: "Da".to_string(),
        },
    ])
}
