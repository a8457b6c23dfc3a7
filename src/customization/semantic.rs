//! Semantic catalog (§4.5.1): a generator-specific table mapping each
//! [`SemanticInsertionPoint`]/[`SemanticReplacementKey`] to one or more regex
//! probes executed against the current body. The catalog is data, not code —
//! additional generators are added here without touching the engine.

use crate::types::{SemanticInsertionPoint, SemanticReplacementKey};
use once_cell::sync::Lazy;
use regex::Regex;

/// Locates a semantic insertion point or replacement range in a template
/// body. Returns byte offsets into `body`.
pub trait SemanticCatalog: Send + Sync {
    fn locate_insertion_point(&self, point: SemanticInsertionPoint, body: &str) -> Option<usize>;
    fn locate_replacement_range(
        &self,
        key: SemanticReplacementKey,
        body: &str,
    ) -> Option<(usize, usize)>;
}

/// Returns the catalog for a generator id. Two generator families are known
/// directly (`java`-style brace-delimited classes with `import` statements,
/// and `spring`, which shares the java catalog); any other generator id
/// falls back to a generic, language-agnostic catalog covering file
/// start/end and blank-line heuristics, so unknown generators never hard
/// error — they just get coarser insertion points.
pub fn catalog_for(generator_id: &str) -> &'static dyn SemanticCatalog {
    match generator_id {
        "java" | "spring" => &JAVA_CATALOG,
        _ => &GENERIC_CATALOG,
    }
}

static BLOCK_COMMENT_AT_START: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*/\*.*?\*/").unwrap());
static PACKAGE_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^package\s+[\w.]+;\s*$").unwrap());
static IMPORT_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^import\s+[\w.*]+;\s*$").unwrap());
static CLASS_DECL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[\w\s]*\bclass\s+\w+[^{]*\{").unwrap());
static CONSTRUCTOR_DECL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*public\s+\w+\s*\([^)]*\)\s*\{").unwrap());
static FIELD_DECL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*(private|protected|public)\s+[\w<>\[\],\s]+\s+\w+;\s*$").unwrap());
static ACCESSOR_DECL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*public\s+[\w<>\[\]]+\s+(get|set|is)\w*\s*\([^)]*\)\s*\{").unwrap());

struct JavaCatalog;
struct GenericCatalog;

static JAVA_CATALOG: JavaCatalog = JavaCatalog;
static GENERIC_CATALOG: GenericCatalog = GenericCatalog;

impl SemanticCatalog for JavaCatalog {
    fn locate_insertion_point(&self, point: SemanticInsertionPoint, body: &str) -> Option<usize> {
        match point {
            SemanticInsertionPoint::StartOfFile => Some(0),
            SemanticInsertionPoint::EndOfFile => Some(body.len()),
            SemanticInsertionPoint::AfterLicense => Some(after_license(body)),
            SemanticInsertionPoint::AfterPackage => {
                Some(PACKAGE_LINE.find(body).map(|m| end_of_line(body, m.end())).unwrap_or(0))
            }
            SemanticInsertionPoint::EndOfImports => Some(end_of_imports(body)),
            SemanticInsertionPoint::AfterClassDeclaration
            | SemanticInsertionPoint::AfterModelDeclaration => {
                CLASS_DECL.find(body).map(|m| end_of_line(body, m.end()))
            }
            SemanticInsertionPoint::BeforeClassEnd => Some(before_class_end(body)),
            SemanticInsertionPoint::AfterConstructor => {
                brace_block_end(body, &CONSTRUCTOR_DECL)
            }
            SemanticInsertionPoint::AfterFields => Some(after_fields(body)),
            SemanticInsertionPoint::AfterGettersSetters => {
                after_getters_setters(body).or_else(|| Some(before_class_end(body)))
            }
        }
    }

    fn locate_replacement_range(
        &self,
        key: SemanticReplacementKey,
        body: &str,
    ) -> Option<(usize, usize)> {
        match key {
            SemanticReplacementKey::ClassDeclaration => CLASS_DECL.find(body).map(|m| (m.start(), m.end())),
            SemanticReplacementKey::PackageDeclaration => {
                PACKAGE_LINE.find(body).map(|m| (m.start(), m.end()))
            }
            SemanticReplacementKey::License => BLOCK_COMMENT_AT_START
                .find(body)
                .map(|m| (m.start(), m.end())),
        }
    }
}

impl SemanticCatalog for GenericCatalog {
    fn locate_insertion_point(&self, point: SemanticInsertionPoint, body: &str) -> Option<usize> {
        match point {
            SemanticInsertionPoint::StartOfFile => Some(0),
            SemanticInsertionPoint::EndOfFile => Some(body.len()),
            SemanticInsertionPoint::AfterLicense => Some(after_license(body)),
            // Without a language-specific grammar, the remaining semantic
            // points degrade to file boundaries: "after" points collapse to
            // start, "before"/structural points collapse to end.
            SemanticInsertionPoint::AfterPackage
            | SemanticInsertionPoint::EndOfImports
            | SemanticInsertionPoint::AfterClassDeclaration
            | SemanticInsertionPoint::AfterModelDeclaration
            | SemanticInsertionPoint::AfterConstructor
            | SemanticInsertionPoint::AfterFields => Some(0),
            SemanticInsertionPoint::BeforeClassEnd | SemanticInsertionPoint::AfterGettersSetters => {
                Some(body.len())
            }
        }
    }

    fn locate_replacement_range(
        &self,
        _key: SemanticReplacementKey,
        _body: &str,
    ) -> Option<(usize, usize)> {
        None
    }
}

fn after_license(body: &str) -> usize {
    BLOCK_COMMENT_AT_START
        .find(body)
        .map(|m| end_of_line(body, m.end()))
        .unwrap_or(0)
}

fn end_of_imports(body: &str) -> usize {
    let mut end = None;
    for m in IMPORT_LINE.find_iter(body) {
        end = Some(m.end());
    }
    end.map(|e| end_of_line(body, e)).unwrap_or(0)
}

fn before_class_end(body: &str) -> usize {
    body.rfind('}').unwrap_or(body.len())
}

fn after_fields(body: &str) -> usize {
    let class_body_start = CLASS_DECL.find(body).map(|m| m.end()).unwrap_or(0);
    let mut end = None;
    for m in FIELD_DECL.find_iter(&body[class_body_start..]) {
        end = Some(class_body_start + m.end());
    }
    end.map(|e| end_of_line(body, e)).unwrap_or(class_body_start)
}

fn after_getters_setters(body: &str) -> Option<usize> {
    let mut last_end = None;
    let mut search_from = 0;
    while let Some(m) = ACCESSOR_DECL.find(&body[search_from..]) {
        let absolute_start = search_from + m.start();
        let brace_pos = search_from + m.end() - 1;
        let block_end = matching_brace_end(body, brace_pos)?;
        last_end = Some(block_end);
        search_from = block_end.max(absolute_start + 1);
        if search_from >= body.len() {
            break;
        }
    }
    last_end
}

fn brace_block_end(body: &str, opener: &Regex) -> Option<usize> {
    let m = opener.find(body)?;
    let brace_pos = m.end() - 1;
    matching_brace_end(body, brace_pos)
}

/// Given the byte index of an opening `{`, returns the index just after its
/// matching closing `}` using simple depth counting (no string/comment
/// awareness — adequate for the generated-code bodies this operates on).
fn matching_brace_end(body: &str, open_brace_pos: usize) -> Option<usize> {
    let bytes = body.as_bytes();
    if bytes.get(open_brace_pos) != Some(&b'{') {
        return None;
    }
    let mut depth = 0i32;
    for (i, &b) in bytes.iter().enumerate().skip(open_brace_pos) {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

fn end_of_line(body: &str, pos: usize) -> usize {
    match body[pos..].find('\n') {
        Some(offset) => pos + offset + 1,
        None => body.len(),
    }
}
