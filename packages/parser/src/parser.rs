//! Island parser for JSX/TSX source
//!
//! Script code is scanned token by token but kept verbatim. The parser only
//! tracks enough structure to find:
//!
//! - named declarations (`function X`, `class X`, `const X = ...`)
//! - embedded markup, which is parsed into a full tree
//! - the syntactic position each markup tree appears in
//!
//! ```text
//! source ──► Script { Code | Declaration | Markup }*
//!                          │             │
//!                          ▼             ▼
//!                       Script       JsxNode ──► children ──► {Script}
//! ```

use crate::ast::*;
use crate::error::{ParseError, ParseResult};
use crate::span_ids::SpanIds;
use crate::lexer::{is_ident_char, is_ident_start, next_token, skip_trivia, Token};
use crate::values::{call_shape, template_chunks};

/// Keywords that begin a statement after an automatic semicolon
const STATEMENT_KEYWORDS: &[&str] = &[
    "const", "let", "var", "function", "class", "export", "import", "return", "if", "for",
    "while", "do", "switch", "try", "throw", "type", "interface", "enum", "async", "break",
    "continue",
];

/// Keywords after which an expression is expected
const EXPRESSION_KEYWORDS: &[&str] = &[
    "typeof", "void", "delete", "new", "in", "of", "instanceof", "throw", "case", "yield",
    "await",
];

/// Where a script run ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    /// End of input
    Module,
    /// Unmatched `}` of a markup expression container
    Container,
}

/// What the previous token leaves the parser expecting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lead {
    Start,
    StatementStart,
    Return,
    Arrow,
    Branch,
    Operand,
    Punct,
    GroupOpen,
}

impl Lead {
    fn expects_expression(self) -> bool {
        self != Lead::Operand
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delim {
    /// Parenthesized expression, remembering what preceded it
    Group { lead: Lead },
    Call,
    Brace { block: bool },
    Bracket,
    /// `${` inside a template literal
    TemplateSub,
}

#[derive(Debug, Clone, Copy)]
struct Modifier {
    start: usize,
    exported: bool,
}

#[derive(Debug)]
struct OpenDeclaration {
    kind: DeclarationKind,
    name: String,
    exported: bool,
    start: usize,
    depth: usize,
    body_open: bool,
    awaiting_init: bool,
    function_valued: bool,
    heritage_start: Option<usize>,
    heritage: Option<String>,
}

#[derive(Debug)]
struct Frame {
    open: Option<OpenDeclaration>,
    parts: Vec<ScriptPart>,
    code_start: usize,
}

struct ScriptState {
    context: Context,
    lead: Lead,
    delims: Vec<Delim>,
    frames: Vec<Frame>,
    modifier: Option<Modifier>,
    prev_end: usize,
}

impl ScriptState {
    fn new(context: Context, start: usize) -> Self {
        Self {
            context,
            lead: Lead::Start,
            delims: Vec::new(),
            frames: vec![Frame {
                open: None,
                parts: Vec::new(),
                code_start: start,
            }],
            modifier: None,
            prev_end: start,
        }
    }

    fn open_declaration(&self) -> Option<&OpenDeclaration> {
        self.frames.last().and_then(|frame| frame.open.as_ref())
    }

    fn open_declaration_mut(&mut self) -> Option<&mut OpenDeclaration> {
        self.frames.last_mut().and_then(|frame| frame.open.as_mut())
    }

    fn only_groups(&self) -> bool {
        self.delims.iter().all(|d| matches!(d, Delim::Group { .. }))
    }

    /// Lead in effect for a markup root, looking through enclosing parentheses
    fn effective_lead(&self) -> Lead {
        let mut lead = self.lead;
        let mut idx = self.delims.len();
        while lead == Lead::GroupOpen && idx > 0 {
            idx -= 1;
            match self.delims[idx] {
                Delim::Group { lead: outer } => lead = outer,
                _ => break,
            }
        }
        lead
    }
}

/// Parser for JSX/TSX source files
pub struct Parser<'src> {
    source: &'src str,
    pos: usize,
    span_ids: SpanIds,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str, span_ids: SpanIds) -> Self {
        Self {
            source,
            pos: 0,
            span_ids,
        }
    }

    pub fn new_with_path(source: &'src str, path: &str) -> Self {
        Self::new(source, SpanIds::for_path(path))
    }

    /// Parse a complete file
    pub fn parse_module(&mut self) -> ParseResult<Module> {
        self.pos = 0;
        let body = self.parse_script(Context::Module)?;
        let span = self.span(0, self.source.len());
        Ok(Module { body, span })
    }

    /// Parse a single markup tree that makes up the whole input
    pub fn parse_markup_fragment(&mut self) -> ParseResult<JsxNode> {
        let start = skip_trivia(self.source, 0);
        if self.char_at(start) != Some('<') {
            return Err(ParseError::unexpected_token(start, "<", self.describe(start)));
        }
        self.pos = start;
        let node = self.parse_jsx_node()?;
        let rest = skip_trivia(self.source, self.pos);
        if rest < self.source.len() {
            return Err(ParseError::unexpected_token(rest, "end of markup", self.describe(rest)));
        }
        Ok(node)
    }

    fn span(&mut self, start: usize, end: usize) -> Span {
        Span::new(start, end, self.span_ids.next_id())
    }

    fn char_at(&self, pos: usize) -> Option<char> {
        self.source.get(pos..).and_then(|rest| rest.chars().next())
    }

    fn peek(&self) -> Option<char> {
        self.char_at(self.pos)
    }

    fn describe(&self, pos: usize) -> String {
        match self.char_at(pos) {
            Some(c) => format!("'{}'", c),
            None => "end of file".to_string(),
        }
    }

    fn expect_char(&mut self, expected: char) -> ParseResult<()> {
        match self.peek() {
            Some(c) if c == expected => {
                self.pos += c.len_utf8();
                Ok(())
            }
            Some(_) => Err(ParseError::unexpected_token(
                self.pos,
                format!("'{}'", expected),
                self.describe(self.pos),
            )),
            None => Err(ParseError::unexpected_eof(self.pos)),
        }
    }

    // ---------------------------------------------------------------------
    // Script
    // ---------------------------------------------------------------------

    fn parse_script(&mut self, context: Context) -> ParseResult<Script> {
        let mut state = ScriptState::new(context, self.pos);

        loop {
            let at = skip_trivia(self.source, self.pos);
            if at >= self.source.len() {
                if context == Context::Container || !state.delims.is_empty() {
                    return Err(ParseError::unexpected_eof(self.source.len()));
                }
                return Ok(self.finish_script(state, self.source.len()));
            }
            let newline_before = self.source[state.prev_end..at].contains('\n');

            if state.lead.expects_expression() {
                match self.source.as_bytes()[at] {
                    b'<' if self.is_markup_start(at) => {
                        self.parse_markup_root(&mut state, at)?;
                        continue;
                    }
                    b'/' => {
                        if let Some(end) = self.scan_regex(at) {
                            self.advance_to(&mut state, end, Lead::Operand);
                            continue;
                        }
                    }
                    _ => {}
                }
            }

            let token = match next_token(self.source, at) {
                Some(Ok(token)) => token,
                Some(Err(range)) => {
                    self.advance_to(&mut state, range.end, Lead::Punct);
                    continue;
                }
                None => {
                    return Ok(self.finish_script(state, self.source.len()));
                }
            };
            let (start, end) = (token.range.start, token.range.end);

            if token.token == Token::RBrace
                && state.delims.is_empty()
                && context == Context::Container
            {
                return Ok(self.finish_script(state, start));
            }

            self.end_declarations_before(&mut state, &token.token, newline_before);

            let after_dot = self.source[..start]
                .trim_end()
                .ends_with('.');
            let lead = match token.token {
                Token::Ident(word) if !after_dot => {
                    self.handle_word(&mut state, word, start, end, newline_before)
                }
                Token::Ident(_) | Token::String(_) | Token::Number(_) => Lead::Operand,
                Token::Backtick => self.scan_template(&mut state, end)?,
                Token::LParen => {
                    let delim = if state.lead == Lead::Operand {
                        Delim::Call
                    } else {
                        Delim::Group { lead: state.lead }
                    };
                    state.delims.push(delim);
                    Lead::GroupOpen
                }
                Token::LBracket => {
                    state.delims.push(Delim::Bracket);
                    Lead::Punct
                }
                Token::LBrace => self.open_brace(&mut state, start),
                Token::RParen | Token::RBracket | Token::RBrace => {
                    self.close_delim(&mut state, token.token, start)?
                }
                Token::Semi => Lead::StatementStart,
                Token::Arrow => Lead::Arrow,
                Token::Question | Token::Colon | Token::AndAnd | Token::OrOr | Token::Nullish => {
                    Lead::Branch
                }
                Token::Update if state.lead == Lead::Operand => Lead::Operand,
                Token::Assign => {
                    self.inspect_initializer(&mut state, end);
                    Lead::Punct
                }
                _ => Lead::Punct,
            };

            if !matches!(token.token, Token::Ident(_)) {
                state.modifier = None;
            }
            if self.pos < end {
                self.pos = end;
            }
            state.lead = lead;
            state.prev_end = self.pos;

            self.end_declarations_after(&mut state, &token.token);
        }
    }

    fn advance_to(&mut self, state: &mut ScriptState, end: usize, lead: Lead) {
        self.pos = end;
        state.prev_end = end;
        state.lead = lead;
        state.modifier = None;
    }

    fn handle_word(
        &mut self,
        state: &mut ScriptState,
        word: &str,
        start: usize,
        end: usize,
        newline_before: bool,
    ) -> Lead {
        let statement_position = matches!(state.lead, Lead::Start | Lead::StatementStart)
            || (newline_before && state.lead == Lead::Operand)
            || state.modifier.is_some();

        match word {
            "export" if statement_position => {
                state.modifier = Some(Modifier {
                    start,
                    exported: true,
                });
                Lead::StatementStart
            }
            "default" | "async" | "declare" | "abstract" if state.modifier.is_some() => {
                Lead::StatementStart
            }
            "async" | "declare" | "abstract" if statement_position => {
                state.modifier = Some(Modifier {
                    start,
                    exported: false,
                });
                Lead::StatementStart
            }
            "function" | "class" if statement_position => {
                let modifier = state.modifier.take();
                let name = self.peek_declaration_name(end, word == "function");
                if let Some(name) = name {
                    let kind = if word == "function" {
                        DeclarationKind::Function
                    } else {
                        DeclarationKind::Class
                    };
                    self.open_declaration(state, kind, name, modifier, start);
                }
                Lead::Punct
            }
            "const" | "let" | "var" if statement_position => {
                let modifier = state.modifier.take();
                if let Some(name) = self.peek_variable_name(end) {
                    self.open_declaration(state, DeclarationKind::Variable, name, modifier, start);
                }
                Lead::Punct
            }
            "extends" => {
                let depth = state.delims.len();
                if let Some(open) = state.open_declaration_mut() {
                    if open.kind == DeclarationKind::Class
                        && !open.body_open
                        && open.depth == depth
                        && open.heritage_start.is_none()
                    {
                        open.heritage_start = Some(end);
                    }
                }
                Lead::Punct
            }
            "implements" => {
                let source = self.source;
                if let Some(open) = state.open_declaration_mut() {
                    finish_heritage(open, source, start);
                }
                state.modifier = None;
                Lead::Punct
            }
            "return" => {
                state.modifier = None;
                Lead::Return
            }
            w if EXPRESSION_KEYWORDS.contains(&w) => {
                state.modifier = None;
                Lead::Punct
            }
            _ => {
                state.modifier = None;
                Lead::Operand
            }
        }
    }

    fn open_brace(&mut self, state: &mut ScriptState, start: usize) -> Lead {
        let block = match state.lead {
            Lead::StatementStart | Lead::Arrow | Lead::Operand => true,
            Lead::Start => state.context == Context::Module,
            _ => false,
        };

        let depth = state.delims.len();
        let source = self.source;
        if let Some(open) = state.open_declaration_mut() {
            if open.kind != DeclarationKind::Variable && !open.body_open && open.depth == depth {
                open.body_open = true;
                finish_heritage(open, source, start);
            }
        }

        state.delims.push(Delim::Brace { block });
        if block {
            Lead::StatementStart
        } else {
            Lead::Punct
        }
    }

    fn close_delim(&mut self, state: &mut ScriptState, token: Token<'_>, start: usize) -> ParseResult<Lead> {
        let found = match token {
            Token::RParen => ")",
            Token::RBracket => "]",
            _ => "}",
        };
        let Some(top) = state.delims.pop() else {
            return Err(ParseError::unexpected_token(start, "expression", found));
        };

        let matches = match top {
            Delim::Group { .. } | Delim::Call => token == Token::RParen,
            Delim::Bracket => token == Token::RBracket,
            Delim::Brace { .. } | Delim::TemplateSub => token == Token::RBrace,
        };
        if !matches {
            let expected = match top {
                Delim::Group { .. } | Delim::Call => "')'",
                Delim::Bracket => "']'",
                Delim::Brace { .. } | Delim::TemplateSub => "'}'",
            };
            return Err(ParseError::unexpected_token(start, expected, found));
        }

        Ok(match top {
            Delim::TemplateSub => self.scan_template(state, start + 1)?,
            Delim::Brace { block: true } => Lead::StatementStart,
            _ => Lead::Operand,
        })
    }

    /// Continue a template literal body from `from`, stopping after the
    /// closing backtick or after a `${`.
    fn scan_template(&mut self, state: &mut ScriptState, from: usize) -> ParseResult<Lead> {
        let bytes = self.source.as_bytes();
        let mut i = from;
        while i < bytes.len() {
            match bytes[i] {
                b'\\' => i += 2,
                b'`' => {
                    self.pos = i + 1;
                    return Ok(Lead::Operand);
                }
                b'$' if bytes.get(i + 1) == Some(&b'{') => {
                    state.delims.push(Delim::TemplateSub);
                    self.pos = i + 2;
                    return Ok(Lead::Punct);
                }
                _ => i += 1,
            }
        }
        Err(ParseError::unexpected_eof(bytes.len()))
    }

    /// End of a regular expression literal starting at `at`
    fn scan_regex(&self, at: usize) -> Option<usize> {
        let bytes = self.source.as_bytes();
        let mut i = at + 1;
        let mut in_class = false;
        while i < bytes.len() {
            match bytes[i] {
                b'\\' => i += 2,
                b'\n' => return None,
                b'[' => {
                    in_class = true;
                    i += 1;
                }
                b']' => {
                    in_class = false;
                    i += 1;
                }
                b'/' if !in_class => {
                    i += 1;
                    while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
                        i += 1;
                    }
                    return Some(i);
                }
                _ => i += 1,
            }
        }
        None
    }

    /// `<` starts markup when followed by `>` or a tag name that is not a
    /// generic parameter list (`<T,>` or `<T extends U>`)
    fn is_markup_start(&self, at: usize) -> bool {
        let rest = &self.source[at + 1..];
        match rest.chars().next() {
            Some('>') => true,
            Some(c) if is_ident_start(c) => {
                let name_len = rest
                    .find(|ch: char| !(is_ident_char(ch) || matches!(ch, '.' | '-' | ':')))
                    .unwrap_or(rest.len());
                let after = skip_trivia(self.source, at + 1 + name_len);
                let tail = &self.source[after..];
                if tail.starts_with(',') {
                    return false;
                }
                if let Some(bound) = tail.strip_prefix("extends") {
                    let next = skip_trivia(bound, 0);
                    let spaced = bound.starts_with(char::is_whitespace);
                    if spaced && !bound[next..].starts_with('=') {
                        return false;
                    }
                }
                true
            }
            _ => false,
        }
    }

    fn parse_markup_root(&mut self, state: &mut ScriptState, at: usize) -> ParseResult<()> {
        let lead = state.effective_lead();
        let only_groups = state.only_groups();

        if let Some(frame) = state.frames.last_mut() {
            flush_code(&mut self.span_ids, frame, at);
        }

        self.pos = at;
        let node = self.parse_jsx_node()?;
        let end = self.pos;

        let position = match lead {
            Lead::Return => MarkupPosition::Return,
            Lead::Arrow => MarkupPosition::ArrowBody,
            _ if state.context == Context::Container
                && only_groups
                && (lead == Lead::Branch || self.followed_by_branch(end)) =>
            {
                MarkupPosition::Branch
            }
            _ => MarkupPosition::Other,
        };

        if let Some(frame) = state.frames.last_mut() {
            frame.parts.push(ScriptPart::Markup(MarkupRoot { node, position }));
            frame.code_start = end;
        }
        self.advance_to(state, end, Lead::Operand);
        Ok(())
    }

    fn followed_by_branch(&self, pos: usize) -> bool {
        matches!(
            next_token(self.source, pos),
            Some(Ok(ref t)) if matches!(
                t.token,
                Token::Question | Token::Colon | Token::AndAnd | Token::OrOr | Token::Nullish
            )
        )
    }

    // ---------------------------------------------------------------------
    // Declarations
    // ---------------------------------------------------------------------

    fn peek_declaration_name(&self, pos: usize, allow_star: bool) -> Option<String> {
        let mut tok = next_token(self.source, pos)?.ok()?;
        if allow_star && tok.token == Token::Operator("*") {
            tok = next_token(self.source, tok.range.end)?.ok()?;
        }
        match tok.token {
            Token::Ident(name) if !matches!(name, "extends" | "implements") => Some(name.to_string()),
            _ => None,
        }
    }

    fn peek_variable_name(&self, pos: usize) -> Option<String> {
        let tok = next_token(self.source, pos)?.ok()?;
        match tok.token {
            Token::Ident(name) if name != "enum" => Some(name.to_string()),
            _ => None,
        }
    }

    fn open_declaration(
        &mut self,
        state: &mut ScriptState,
        kind: DeclarationKind,
        name: String,
        modifier: Option<Modifier>,
        keyword_start: usize,
    ) {
        let start = modifier.map(|m| m.start).unwrap_or(keyword_start);
        if let Some(frame) = state.frames.last_mut() {
            flush_code(&mut self.span_ids, frame, start);
        }
        state.frames.push(Frame {
            open: Some(OpenDeclaration {
                kind,
                name,
                exported: modifier.map(|m| m.exported).unwrap_or(false),
                start,
                depth: state.delims.len(),
                body_open: false,
                awaiting_init: kind == DeclarationKind::Variable,
                function_valued: false,
                heritage_start: None,
                heritage: None,
            }),
            parts: Vec::new(),
            code_start: start,
        });
    }

    fn close_declaration(&mut self, state: &mut ScriptState, end: usize) {
        if state.frames.len() < 2 {
            return;
        }
        let Some(mut frame) = state.frames.pop() else {
            return;
        };
        flush_code(&mut self.span_ids, &mut frame, end);
        let Some(open) = frame.open else {
            return;
        };

        let span = self.span(open.start, end.max(open.start));
        let declaration = Declaration {
            kind: open.kind,
            name: open.name,
            exported: open.exported,
            heritage: open.heritage,
            function_valued: open.function_valued,
            body: Script { parts: frame.parts },
            span,
        };
        if let Some(parent) = state.frames.last_mut() {
            parent.parts.push(ScriptPart::Declaration(declaration));
            parent.code_start = end.max(parent.code_start);
        }
    }

    /// Close declarations that end before `token`
    fn end_declarations_before(&mut self, state: &mut ScriptState, token: &Token<'_>, newline_before: bool) {
        loop {
            let depth = state.delims.len();
            let lead = state.lead;
            let Some(open) = state.open_declaration() else {
                return;
            };
            if open.depth != depth {
                return;
            }

            let statement_follows = newline_before
                && matches!(lead, Lead::Operand | Lead::StatementStart)
                && token.ident().is_some_and(|w| STATEMENT_KEYWORDS.contains(&w));
            let ends = match open.kind {
                DeclarationKind::Variable => token.is_closer() || statement_follows,
                DeclarationKind::Function | DeclarationKind::Class => token.is_closer(),
            };
            if !ends {
                return;
            }
            let end = state.prev_end;
            self.close_declaration(state, end);
        }
    }

    /// Close declarations completed by the token just consumed
    fn end_declarations_after(&mut self, state: &mut ScriptState, token: &Token<'_>) {
        let depth = state.delims.len();
        let Some(open) = state.open_declaration() else {
            return;
        };
        if open.depth != depth {
            return;
        }

        let ends = match (open.kind, token) {
            (DeclarationKind::Variable, Token::Semi) => true,
            (_, Token::Semi) => !open.body_open,
            (DeclarationKind::Function | DeclarationKind::Class, Token::RBrace) => open.body_open,
            _ => false,
        };
        if ends {
            let end = state.prev_end;
            self.close_declaration(state, end);
        }
    }

    /// On `=` directly after a variable name, look ahead to see whether the
    /// initializer is a function
    fn inspect_initializer(&mut self, state: &mut ScriptState, pos: usize) {
        let depth = state.delims.len();
        let function_valued = match state.open_declaration() {
            Some(open) if open.awaiting_init && open.depth == depth => self.is_function_initializer(pos),
            _ => return,
        };
        if let Some(open) = state.open_declaration_mut() {
            open.awaiting_init = false;
            open.function_valued = function_valued;
        }
    }

    fn is_function_initializer(&self, pos: usize) -> bool {
        let Some(Ok(mut tok)) = next_token(self.source, pos) else {
            return false;
        };
        if tok.token == Token::Ident("async") {
            match next_token(self.source, tok.range.end) {
                Some(Ok(next)) => tok = next,
                _ => return false,
            }
        }

        match tok.token {
            Token::Ident("function") => true,
            Token::Ident(_) => matches!(
                next_token(self.source, tok.range.end),
                Some(Ok(ref next)) if next.token == Token::Arrow
            ),
            Token::LParen => self.arrow_follows_params(tok.range.start),
            _ => false,
        }
    }

    /// Whether the parameter list opening at `open` is followed by `=>`,
    /// allowing a return type annotation in between
    fn arrow_follows_params(&self, open: usize) -> bool {
        let mut depth = 0usize;
        let mut pos = open;
        let mut closed = false;
        for _ in 0..256 {
            let Some(Ok(tok)) = next_token(self.source, pos) else {
                return false;
            };
            pos = tok.range.end;
            match tok.token {
                Token::LParen | Token::LBracket | Token::LBrace => depth += 1,
                Token::RParen | Token::RBracket | Token::RBrace => {
                    if depth == 0 {
                        return false;
                    }
                    depth -= 1;
                    if depth == 0 {
                        closed = true;
                    }
                }
                Token::Backtick => return false,
                Token::Arrow if closed && depth == 0 => return true,
                _ if closed && depth == 0 => {
                    let annotation = matches!(
                        tok.token,
                        Token::Colon
                            | Token::Ident(_)
                            | Token::Dot
                            | Token::Lt
                            | Token::Gt
                            | Token::Comma
                            | Token::Question
                            | Token::Operator("|")
                            | Token::Operator("&")
                    );
                    if !annotation {
                        return false;
                    }
                }
                _ => {}
            }
        }
        false
    }

    fn finish_script(&mut self, mut state: ScriptState, code_end: usize) -> Script {
        while state.frames.len() > 1 {
            let end = state.prev_end;
            self.close_declaration(&mut state, end);
        }
        self.pos = code_end;
        match state.frames.pop() {
            Some(mut root) => {
                flush_code(&mut self.span_ids, &mut root, code_end);
                Script { parts: root.parts }
            }
            None => Script::default(),
        }
    }

    // ---------------------------------------------------------------------
    // Markup
    // ---------------------------------------------------------------------

    fn read_jsx_name(&mut self) -> String {
        let rest = &self.source[self.pos..];
        let len = rest
            .find(|c: char| !(is_ident_char(c) || matches!(c, '.' | '-' | ':')))
            .unwrap_or(rest.len());
        self.pos += len;
        rest[..len].to_string()
    }

    fn parse_jsx_node(&mut self) -> ParseResult<JsxNode> {
        let start = self.pos;
        self.expect_char('<')?;
        self.pos = skip_trivia(self.source, self.pos);

        if self.peek() == Some('>') {
            self.pos += 1;
            let opening = self.span(start, self.pos);
            let children = self.parse_jsx_children()?;
            let closing_start = self.pos;
            let name = self.parse_closing_tag()?;
            if !name.is_empty() {
                return Err(ParseError::mismatched_closing_tag(closing_start, "", name));
            }
            let closing = self.span(closing_start, self.pos);
            let span = self.span(start, self.pos);
            return Ok(JsxNode::Fragment(Fragment {
                children,
                span,
                opening,
                closing,
            }));
        }

        let name = self.read_jsx_name();
        if name.is_empty() {
            return Err(ParseError::unexpected_token(self.pos, "tag name", self.describe(self.pos)));
        }
        let name_end = self.pos;

        let mut attributes = Vec::new();
        let mut attrs_end = name_end;
        let self_closing = loop {
            self.pos = skip_trivia(self.source, self.pos);
            match self.peek() {
                None => return Err(ParseError::unexpected_eof(self.pos)),
                Some('/') if self.source[self.pos..].starts_with("/>") => {
                    self.pos += 2;
                    break true;
                }
                Some('>') => {
                    self.pos += 1;
                    break false;
                }
                Some('{') => {
                    attributes.push(self.parse_spread_attribute()?);
                    attrs_end = self.pos;
                }
                Some(_) => {
                    attributes.push(self.parse_named_attribute()?);
                    attrs_end = self.pos;
                }
            }
        };
        let opening = self.span(start, self.pos);

        if self_closing {
            let span = self.span(start, self.pos);
            return Ok(JsxNode::Element(Element {
                name,
                attributes,
                children: Vec::new(),
                self_closing,
                span,
                opening,
                name_end,
                attrs_end,
                closing: None,
            }));
        }

        let children = self.parse_jsx_children()?;
        let closing_start = self.pos;
        let closing_name = self.parse_closing_tag()?;
        if closing_name != name {
            return Err(ParseError::mismatched_closing_tag(closing_start, name, closing_name));
        }
        let closing = self.span(closing_start, self.pos);
        let span = self.span(start, self.pos);

        Ok(JsxNode::Element(Element {
            name,
            attributes,
            children,
            self_closing,
            span,
            opening,
            name_end,
            attrs_end,
            closing: Some(closing),
        }))
    }

    /// Consume `</name>` and return the name (empty for fragments)
    fn parse_closing_tag(&mut self) -> ParseResult<String> {
        self.pos += 2;
        self.pos = skip_trivia(self.source, self.pos);
        let name = self.read_jsx_name();
        self.pos = skip_trivia(self.source, self.pos);
        self.expect_char('>')?;
        Ok(name)
    }

    fn parse_jsx_children(&mut self) -> ParseResult<Vec<JsxChild>> {
        let mut children = Vec::new();
        loop {
            let start = self.pos;
            match self.peek() {
                None => return Err(ParseError::unexpected_eof(self.pos)),
                Some('<') if self.source[start..].starts_with("</") => return Ok(children),
                Some('<') => {
                    let node = self.parse_jsx_node()?;
                    children.push(node.into_child());
                }
                Some('{') => {
                    self.pos += 1;
                    let script = self.parse_script(Context::Container)?;
                    self.expect_char('}')?;
                    let span = self.span(start, self.pos);
                    children.push(JsxChild::Expression(ExpressionContainer { script, span }));
                }
                Some(_) => {
                    let end = self.source[start..]
                        .find(|c: char| c == '<' || c == '{')
                        .map(|offset| start + offset)
                        .unwrap_or(self.source.len());
                    self.pos = end;
                    let span = self.span(start, end);
                    children.push(JsxChild::Text(Text {
                        raw: self.source[start..end].to_string(),
                        span,
                    }));
                }
            }
        }
    }

    fn parse_spread_attribute(&mut self) -> ParseResult<Attribute> {
        let start = self.pos;
        self.expect_char('{')?;
        let script = self.parse_script(Context::Container)?;
        self.expect_char('}')?;
        let span = self.span(start, self.pos);
        Ok(Attribute::Spread(SpreadAttribute { script, span }))
    }

    fn parse_named_attribute(&mut self) -> ParseResult<Attribute> {
        let start = self.pos;
        let name = self.read_jsx_name();
        if name.is_empty() {
            return Err(ParseError::unexpected_token(start, "attribute name", self.describe(start)));
        }
        let name_end = self.pos;

        let after = skip_trivia(self.source, name_end);
        if self.char_at(after) != Some('=') {
            let span = self.span(start, name_end);
            return Ok(Attribute::Named(NamedAttribute {
                name,
                value: AttributeValue::Absent,
                span,
            }));
        }

        self.pos = skip_trivia(self.source, after + 1);
        let value = match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                let value_start = self.pos + 1;
                let close = self.source[value_start..]
                    .find(quote)
                    .map(|offset| value_start + offset)
                    .ok_or_else(|| ParseError::unexpected_eof(self.source.len()))?;
                self.pos = close + 1;
                AttributeValue::String(StringValue {
                    value: self.source[value_start..close].to_string(),
                    quote,
                })
            }
            Some('{') => self.parse_attribute_expression()?,
            Some('<') => AttributeValue::Element {
                node: Box::new(self.parse_jsx_node()?),
            },
            Some(_) => {
                return Err(ParseError::unexpected_token(
                    self.pos,
                    "attribute value",
                    self.describe(self.pos),
                ))
            }
            None => return Err(ParseError::unexpected_eof(self.pos)),
        };

        let span = self.span(start, self.pos);
        Ok(Attribute::Named(NamedAttribute { name, value, span }))
    }

    fn parse_attribute_expression(&mut self) -> ParseResult<AttributeValue> {
        let open = self.pos;
        self.expect_char('{')?;
        let script = self.parse_script(Context::Container)?;
        self.expect_char('}')?;

        let raw = &self.source[open + 1..self.pos - 1];
        let trimmed = raw.trim();
        if let Some(chunks) = template_chunks(trimmed) {
            return Ok(AttributeValue::Template(TemplateValue { chunks }));
        }

        let span = self.span(open, self.pos);
        Ok(AttributeValue::Expression(ExpressionValue {
            raw: raw.to_string(),
            script,
            call: call_shape(trimmed),
            span,
        }))
    }
}

fn flush_code(ids: &mut SpanIds, frame: &mut Frame, until: usize) {
    if until > frame.code_start {
        frame.parts.push(ScriptPart::Code {
            span: Span::new(frame.code_start, until, ids.next_id()),
        });
        frame.code_start = until;
    }
}

fn finish_heritage(open: &mut OpenDeclaration, source: &str, end: usize) {
    if let (Some(start), None) = (open.heritage_start, &open.heritage) {
        if start <= end {
            open.heritage = Some(source[start..end].trim().to_string());
        }
    }
}

/// Strip source positions from a parsed tree so it prints as generated code
pub(crate) fn detach_node(node: &mut JsxNode, source: &str) {
    match node {
        JsxNode::Element(el) => detach_element(el, source),
        JsxNode::Fragment(frag) => detach_fragment(frag, source),
    }
}

fn detach_fragment(frag: &mut Fragment, source: &str) {
    frag.span = Span::detached();
    frag.opening = Span::detached();
    frag.closing = Span::detached();
    detach_children(&mut frag.children, source);
}

fn detach_element(el: &mut Element, source: &str) {
    el.span = Span::detached();
    el.opening = Span::detached();
    el.closing = None;
    el.name_end = usize::MAX;
    el.attrs_end = usize::MAX;

    for attr in &mut el.attributes {
        match attr {
            Attribute::Named(named) => {
                named.span = Span::detached();
                match &mut named.value {
                    AttributeValue::Expression(value) => {
                        value.span = Span::detached();
                        detach_script(&mut value.script, source);
                    }
                    AttributeValue::Element { node } => detach_node(node, source),
                    AttributeValue::Absent
                    | AttributeValue::String(_)
                    | AttributeValue::Template(_) => {}
                }
            }
            Attribute::Spread(spread) => {
                spread.span = Span::detached();
                detach_script(&mut spread.script, source);
            }
        }
    }
    detach_children(&mut el.children, source);
}

fn detach_children(children: &mut [JsxChild], source: &str) {
    for child in children {
        match child {
            JsxChild::Element(el) => detach_element(el, source),
            JsxChild::Fragment(frag) => detach_fragment(frag, source),
            JsxChild::Text(text) => text.span = Span::detached(),
            JsxChild::Expression(expr) => {
                expr.span = Span::detached();
                detach_script(&mut expr.script, source);
            }
        }
    }
}

fn detach_script(script: &mut Script, source: &str) {
    for part in &mut script.parts {
        match part {
            ScriptPart::Code { span } => {
                let text = source.get(span.start..span.end).unwrap_or_default().to_string();
                *part = ScriptPart::Generated { text };
            }
            ScriptPart::Generated { .. } => {}
            ScriptPart::Declaration(decl) => {
                decl.span = Span::detached();
                detach_script(&mut decl.body, source);
            }
            ScriptPart::Markup(root) => detach_node(&mut root.node, source),
        }
    }
}
