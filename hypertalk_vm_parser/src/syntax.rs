//! English-command syntax templates
//!
//! A [`Syntax`] describes one multi-word command shape such as
//! `put <expr> into <container>`. The parser tries each registered template
//! in order, restoring its cursor whenever one fails to match; the first
//! success compiles into a plain command call. Hosts may register their own
//! templates before parsing.

/// What a template element parses.
#[derive(Debug, Clone, PartialEq)]
pub enum SyntaxValueKind {
    /// A full expression, pushed as an argument
    Expression,
    /// An expression parsed in writable mode, so a fresh identifier becomes
    /// a local and compiles to a reference the callee can write through
    Container,
    /// One of the listed keyword words, pushed as a string argument
    Identifier(Vec<String>),
    /// Any identifier word, pushed as a string argument
    AnyIdentifier,
    /// No value; the element only consumes its prefix words
    None,
}

/// One element of a template: optional literal prefix words followed by a
/// value to parse.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxElement {
    /// Literal identifier words consumed before the value, e.g. `into`
    pub prefix: Vec<String>,
    pub kind: SyntaxValueKind,
    /// Optional elements that fail to match are skipped instead of failing
    /// the whole template, so argument counts vary at the call site
    pub required: bool,
}

impl SyntaxElement {
    pub fn expression() -> Self {
        Self {
            prefix: Vec::new(),
            kind: SyntaxValueKind::Expression,
            required: true,
        }
    }

    pub fn container_after(prefix: &str) -> Self {
        Self {
            prefix: vec![prefix.to_string()],
            kind: SyntaxValueKind::Container,
            required: true,
        }
    }

    pub fn any_identifier() -> Self {
        Self {
            prefix: Vec::new(),
            kind: SyntaxValueKind::AnyIdentifier,
            required: true,
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn after(mut self, prefix: &str) -> Self {
        self.prefix = vec![prefix.to_string()];
        self
    }
}

/// An English command template.
#[derive(Debug, Clone, PartialEq)]
pub struct Syntax {
    /// Introductory identifier word(s) that select this template
    pub words: Vec<String>,
    pub elements: Vec<SyntaxElement>,
}

impl Syntax {
    pub fn new(words: &[&str], elements: Vec<SyntaxElement>) -> Self {
        Self {
            words: words.iter().map(|w| w.to_string()).collect(),
            elements,
        }
    }

    /// The command name a successful match compiles to: the template's
    /// introductory words, lowercased and joined.
    pub fn name(&self) -> String {
        self.words
            .iter()
            .map(|w| w.to_ascii_lowercase())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// The built-in command templates every parser starts with.
pub fn standard_syntaxes() -> Vec<Syntax> {
    vec![
        // put <expr> into <container>
        Syntax::new(
            &["put"],
            vec![
                SyntaxElement::expression(),
                SyntaxElement::container_after("into"),
            ],
        ),
        // add <expr> to <container>
        Syntax::new(
            &["add"],
            vec![
                SyntaxElement::expression(),
                SyntaxElement::container_after("to"),
            ],
        ),
        // subtract <expr> from <container>
        Syntax::new(
            &["subtract"],
            vec![
                SyntaxElement::expression(),
                SyntaxElement::container_after("from"),
            ],
        ),
        // create <kind> [<expr>]
        Syntax::new(
            &["create"],
            vec![
                SyntaxElement::any_identifier(),
                SyntaxElement::expression().optional(),
            ],
        ),
    ]
}
