//! Statically declared mapping from page labels to record destinations

use crate::extract::text::{canonical_label, collapse_whitespace, scrub_promotional, to_title_case};
use crate::record::{InchiPair, Interaction, MoaRow, MolWeight, Record};

/// Every record attribute a detail page can label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    Smiles,
    Id,
    Molecule,
    Cas,
    IupacName,
    Background,
    Inchi,
    InchiKey,
    Summary,
    Weight,
    Formula,
    Description,
    Categories,
    Type,
    Groups,
    Synonyms,
    Indication,
    Pharmacodynamics,
    MechanismOfAction,
    AdverseEffects,
    DrugInteractions,
    HalfLife,
    RouteOfElimination,
    Toxicity,
    Clearance,
    Absorption,
}

/// Labels whose canonical form differs from the attribute name
const ALIASES: [(&str, Attribute); 5] = [
    ("DrugbankAccessionNumber", Attribute::Id),
    ("GenericName", Attribute::Molecule),
    ("CasNumber", Attribute::Cas),
    ("ChemicalFormula", Attribute::Formula),
    ("Moa", Attribute::MechanismOfAction),
];

impl Attribute {
    pub const ALL: [Attribute; 26] = [
        Attribute::Smiles,
        Attribute::Id,
        Attribute::Molecule,
        Attribute::Cas,
        Attribute::IupacName,
        Attribute::Background,
        Attribute::Inchi,
        Attribute::InchiKey,
        Attribute::Summary,
        Attribute::Weight,
        Attribute::Formula,
        Attribute::Description,
        Attribute::Categories,
        Attribute::Type,
        Attribute::Groups,
        Attribute::Synonyms,
        Attribute::Indication,
        Attribute::Pharmacodynamics,
        Attribute::MechanismOfAction,
        Attribute::AdverseEffects,
        Attribute::DrugInteractions,
        Attribute::HalfLife,
        Attribute::RouteOfElimination,
        Attribute::Toxicity,
        Attribute::Clearance,
        Attribute::Absorption,
    ];

    /// Resolves a page label, or `None` when no attribute matches
    pub fn from_label(label: &str) -> Option<Self> {
        let canonical = canonical_label(label);

        if canonical.is_empty() {
            return None;
        }

        // Folding lowercases acronyms ("IUPAC" becomes "Iupac"), so compare without case
        if let Some((_, attribute)) = ALIASES
            .iter()
            .find(|(alias, _)| alias.eq_ignore_ascii_case(&canonical))
        {
            return Some(*attribute);
        }

        Self::ALL
            .into_iter()
            .find(|attribute| attribute.canonical().eq_ignore_ascii_case(&canonical))
    }

    /// Canonical CamelCase name
    pub fn canonical(self) -> &'static str {
        match self {
            Attribute::Smiles => "Smiles",
            Attribute::Id => "Id",
            Attribute::Molecule => "Molecule",
            Attribute::Cas => "Cas",
            Attribute::IupacName => "IupacName",
            Attribute::Background => "Background",
            Attribute::Inchi => "Inchi",
            Attribute::InchiKey => "InchiKey",
            Attribute::Summary => "Summary",
            Attribute::Weight => "Weight",
            Attribute::Formula => "Formula",
            Attribute::Description => "Description",
            Attribute::Categories => "Categories",
            Attribute::Type => "Type",
            Attribute::Groups => "Groups",
            Attribute::Synonyms => "Synonyms",
            Attribute::Indication => "Indication",
            Attribute::Pharmacodynamics => "Pharmacodynamics",
            Attribute::MechanismOfAction => "MechanismOfAction",
            Attribute::AdverseEffects => "AdverseEffects",
            Attribute::DrugInteractions => "DrugInteractions",
            Attribute::HalfLife => "HalfLife",
            Attribute::RouteOfElimination => "RouteOfElimination",
            Attribute::Toxicity => "Toxicity",
            Attribute::Clearance => "Clearance",
            Attribute::Absorption => "Absorption",
        }
    }

    /// Name of the destination as it appears in serialized records
    pub fn field_name(self) -> &'static str {
        match self {
            Attribute::Smiles => "smiles",
            Attribute::Id => "id",
            Attribute::Molecule => "molecule",
            Attribute::Cas => "cas",
            Attribute::IupacName => "iupac_name",
            Attribute::Background => "background",
            Attribute::Inchi => "inchi.id",
            Attribute::InchiKey => "inchi.hash",
            Attribute::Summary => "summary",
            Attribute::Weight => "weight",
            Attribute::Formula => "formula",
            Attribute::Description => "description",
            Attribute::Categories => "categories",
            Attribute::Type => "type",
            Attribute::Groups => "groups",
            Attribute::Synonyms => "synonyms",
            Attribute::Indication => "indication",
            Attribute::Pharmacodynamics => "pharmacodynamics",
            Attribute::MechanismOfAction => "moa",
            Attribute::AdverseEffects => "adverse_effects",
            Attribute::DrugInteractions => "drug_interactions",
            Attribute::HalfLife => "half_life",
            Attribute::RouteOfElimination => "route_of_elimination",
            Attribute::Toxicity => "toxicity",
            Attribute::Clearance => "clearance",
            Attribute::Absorption => "absorption",
        }
    }

    /// Borrows the destination this attribute writes into
    pub fn slot(self, record: &mut Record) -> Slot<'_> {
        match self {
            Attribute::Smiles => Slot::Scalar(&mut record.smiles),
            Attribute::Id => Slot::Scalar(&mut record.id),
            Attribute::Molecule => Slot::Scalar(&mut record.molecule),
            Attribute::Cas => Slot::Scalar(&mut record.cas),
            Attribute::IupacName => Slot::Scalar(&mut record.iupac_name),
            Attribute::Background => Slot::Scalar(&mut record.background),
            Attribute::Inchi | Attribute::InchiKey => Slot::Inchi(&mut record.inchi),
            Attribute::Summary => Slot::Scalar(&mut record.summary),
            Attribute::Weight => Slot::Weights(&mut record.weight),
            Attribute::Formula => Slot::Scalar(&mut record.formula),
            Attribute::Description => Slot::Scalar(&mut record.description),
            Attribute::Categories => Slot::List(&mut record.categories),
            Attribute::Type => Slot::Scalar(&mut record.kind),
            Attribute::Groups => Slot::List(&mut record.groups),
            Attribute::Synonyms => Slot::List(&mut record.synonyms),
            Attribute::Indication => Slot::Scalar(&mut record.indication),
            Attribute::Pharmacodynamics => Slot::Scalar(&mut record.pharmacodynamics),
            Attribute::MechanismOfAction => Slot::Moa(&mut record.moa),
            Attribute::AdverseEffects => Slot::Scalar(&mut record.adverse_effects),
            Attribute::DrugInteractions => Slot::Interactions(&mut record.drug_interactions),
            Attribute::HalfLife => Slot::Scalar(&mut record.half_life),
            Attribute::RouteOfElimination => Slot::Scalar(&mut record.route_of_elimination),
            Attribute::Toxicity => Slot::Scalar(&mut record.toxicity),
            Attribute::Clearance => Slot::Scalar(&mut record.clearance),
            Attribute::Absorption => Slot::Scalar(&mut record.absorption),
        }
    }

    /// Transform applied when the value is assigned without a handler
    pub fn transform(self) -> TextTransform {
        match self {
            Attribute::Id => TextTransform::Upper,
            Attribute::Description => TextTransform::Title,
            Attribute::AdverseEffects => TextTransform::ScrubPromotional,
            _ => TextTransform::Plain,
        }
    }
}

/// A typed, mutable view of one record destination
#[derive(Debug)]
pub enum Slot<'r> {
    Scalar(&'r mut String),
    List(&'r mut Vec<String>),
    Weights(&'r mut Vec<MolWeight>),
    Moa(&'r mut Vec<MoaRow>),
    Inchi(&'r mut InchiPair),
    Interactions(&'r mut Vec<Interaction>),
}

impl Slot<'_> {
    pub fn kind(&self) -> &'static str {
        match self {
            Slot::Scalar(_) => "scalar",
            Slot::List(_) => "list",
            Slot::Weights(_) => "weight list",
            Slot::Moa(_) => "mechanism-of-action table",
            Slot::Inchi(_) => "identifier pair",
            Slot::Interactions(_) => "interaction list",
        }
    }
}

/// Text rewrite applied by the default assignment strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextTransform {
    Plain,
    Upper,
    Title,
    ScrubPromotional,
}

impl TextTransform {
    pub fn apply(self, raw: &str) -> String {
        let text = collapse_whitespace(raw);
        match self {
            TextTransform::Plain => text,
            TextTransform::Upper => text.to_uppercase(),
            TextTransform::Title => to_title_case(&text),
            TextTransform::ScrubPromotional => scrub_promotional(&text),
        }
    }
}
