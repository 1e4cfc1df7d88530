use std::fmt;

#[derive(Debug, PartialEq, Clone)]
pub struct Token {
    pub index: usize,
    pub kind: Kind,
    pub value: Option<String>,
    pub keyword: Option<Kind>,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
#[allow(non_camel_case_types)]
pub enum Kind {
    // Structural
    EOF,
    Whitespace,
    Newline,
    Semicolon,
    Comment,
    Error,

    // Literals
    Number,
    String,
    Object,

    // Annotations
    t, // bot token
    g, // guild
    c, // channel
    m, // message
    u, // user
    A, // attachment
    E, // embed
    M, // mention

    // Keywords
    Use,
    Listen,
    Include,
    Exclude,
    Fetch,
    From,
    Read,
    Limit,
    Before,
    After,
    Around,
    Delete,
    Send,
    In,
    Edit,
    With,
    Show,
    Presence,
    Raw,
}

const KEYWORDS: [(&str, Kind); 19] = [
    ("use", Kind::Use),
    ("listen", Kind::Listen),
    ("include", Kind::Include),
    ("exclude", Kind::Exclude),
    ("fetch", Kind::Fetch),
    ("from", Kind::From),
    ("read", Kind::Read),
    ("limit", Kind::Limit),
    ("before", Kind::Before),
    ("after", Kind::After),
    ("around", Kind::Around),
    ("delete", Kind::Delete),
    ("send", Kind::Send),
    ("in", Kind::In),
    ("edit", Kind::Edit),
    ("with", Kind::With),
    ("show", Kind::Show),
    ("presence", Kind::Presence),
    ("raw", Kind::Raw),
];

impl Kind {
    /// Case-insensitive keyword lookup.
    pub fn keyword(ident: &str) -> Option<Kind> {
        let lower = ident.to_ascii_lowercase();
        KEYWORDS
            .iter()
            .find(|(name, _)| *name == lower)
            .map(|(_, kind)| *kind)
    }

    pub fn annotation(ch: char) -> Option<Kind> {
        match ch {
            't' => Some(Kind::t),
            'g' => Some(Kind::g),
            'c' => Some(Kind::c),
            'm' => Some(Kind::m),
            'u' => Some(Kind::u),
            'A' => Some(Kind::A),
            'E' => Some(Kind::E),
            'M' => Some(Kind::M),
            _ => None,
        }
    }

    pub fn is_keyword(self) -> bool {
        KEYWORDS.iter().any(|(_, kind)| *kind == self)
    }

    pub fn is_annotation(self) -> bool {
        matches!(
            self,
            Kind::t | Kind::g | Kind::c | Kind::m | Kind::u | Kind::A | Kind::E | Kind::M
        )
    }

    pub fn is_literal(self) -> bool {
        matches!(self, Kind::Number | Kind::String | Kind::Object)
    }

    /// Keywords that may open a statement.
    pub fn is_separator(self) -> bool {
        Separator::from_kind(self).is_some()
    }

    /// Tokens the statement splitter drops.
    pub fn is_noop(self) -> bool {
        matches!(self, Kind::Whitespace | Kind::Newline | Kind::Comment)
    }
}

/// The keywords a statement can start with.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum Separator {
    Use,
    Listen,
    Fetch,
    Read,
    Delete,
    Send,
    Edit,
    Show,
    Presence,
    Raw,
}

impl Separator {
    pub fn from_kind(kind: Kind) -> Option<Self> {
        match kind {
            Kind::Use => Some(Separator::Use),
            Kind::Listen => Some(Separator::Listen),
            Kind::Fetch => Some(Separator::Fetch),
            Kind::Read => Some(Separator::Read),
            Kind::Delete => Some(Separator::Delete),
            Kind::Send => Some(Separator::Send),
            Kind::Edit => Some(Separator::Edit),
            Kind::Show => Some(Separator::Show),
            Kind::Presence => Some(Separator::Presence),
            Kind::Raw => Some(Separator::Raw),
            _ => None,
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match KEYWORDS.iter().find(|(_, kind)| kind == self) {
            Some((name, _)) => write!(f, "{}", name.to_ascii_uppercase()),
            None => write!(f, "{:?}", self),
        }
    }
}
