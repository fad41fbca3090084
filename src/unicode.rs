//! Resolution of `\p{...}` names to code point classes.

use crate::blocks::{self, Block};
use crate::charclasses;
use crate::uniset::{Run, Uniset};
use icu_properties::{maps, GeneralCategoryGroup, Script};

/// The composite categories layered on top of the Unicode tables.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Extension {
    /// `Xan`: alphanumeric, the categories L and N.
    Alnum,
    /// `Xwd`: word characters, `Xan` plus `_`.
    Word,
    /// `Xsp`: whitespace, the category Zs plus literal whitespace.
    Space,
}

/// A resolved property class.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyClass {
    Category(GeneralCategoryGroup),
    Script(Script),
    Block(&'static Block),
    Extension(Extension),
    /// `Any` aliases the full assigned set.
    Any,
}

/// Normalize a block name: case-fold, spaces and hyphens to underscores.
fn normalize(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            ' ' | '-' => '_',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}

/// Resolve a property name, in order: the literal category table
/// (case-sensitive), the extension set, blocks (on the normalized name),
/// then scripts.
pub fn resolve(name: &str) -> Option<PropertyClass> {
    if name == "Any" {
        return Some(PropertyClass::Any);
    }
    if let Some(group) = GeneralCategoryGroup::name_to_enum_mapper().get_strict(name) {
        return Some(PropertyClass::Category(group));
    }
    match name {
        "Xan" => return Some(PropertyClass::Extension(Extension::Alnum)),
        "Xwd" => return Some(PropertyClass::Extension(Extension::Word)),
        "Xsp" => return Some(PropertyClass::Extension(Extension::Space)),
        _ => {}
    }
    if let Some(block) = blocks::lookup(&normalize(name)) {
        return Some(PropertyClass::Block(block));
    }
    Script::name_to_enum_mapper()
        .get_loose(name)
        .map(PropertyClass::Script)
}

fn category_contains(group: GeneralCategoryGroup, cp: u32) -> bool {
    match char::from_u32(cp) {
        Some(c) => group.contains(maps::general_category().get(c)),
        None => false,
    }
}

fn extension_contains(ext: Extension, cp: u32) -> bool {
    match ext {
        Extension::Alnum => {
            category_contains(GeneralCategoryGroup::Letter, cp)
                || category_contains(GeneralCategoryGroup::Number, cp)
        }
        Extension::Word => cp == '_' as u32 || extension_contains(Extension::Alnum, cp),
        Extension::Space => {
            category_contains(GeneralCategoryGroup::SpaceSeparator, cp)
                || charclasses::LITERAL_WHITESPACE.iter().any(|r| r.contains(cp))
        }
    }
}

/// Collect the runs of a category group from the general category table.
fn category_runs(group: GeneralCategoryGroup) -> Vec<Run> {
    maps::general_category()
        .iter_ranges()
        .filter(|range| group.contains(range.value))
        .map(|range| Run::span(*range.range.start(), *range.range.end()))
        .collect()
}

fn script_runs(script: Script) -> Vec<Run> {
    maps::script()
        .iter_ranges()
        .filter(|range| range.value == script)
        .map(|range| Run::span(*range.range.start(), *range.range.end()))
        .collect()
}

impl PropertyClass {
    /// Membership test for one code point.
    pub fn contains(&self, cp: u32) -> bool {
        match self {
            PropertyClass::Category(group) => category_contains(*group, cp),
            PropertyClass::Script(script) => match char::from_u32(cp) {
                Some(c) => maps::script().get(c) == *script,
                None => false,
            },
            PropertyClass::Block(block) => block.first <= cp && cp <= block.last,
            PropertyClass::Extension(ext) => extension_contains(*ext, cp),
            PropertyClass::Any => true,
        }
    }

    /// The class as a set, for the generator's sampling.
    pub fn to_uniset(&self) -> Uniset {
        match self {
            PropertyClass::Category(group) => Uniset::from_runs(category_runs(*group)),
            PropertyClass::Script(script) => Uniset::from_runs(script_runs(*script)),
            PropertyClass::Block(block) => Uniset::range(block.first, block.last),
            PropertyClass::Extension(ext) => match ext {
                Extension::Alnum => Uniset::from_runs(category_runs(GeneralCategoryGroup::Letter))
                    .union(Uniset::from_runs(category_runs(GeneralCategoryGroup::Number))),
                Extension::Word => {
                    PropertyClass::Extension(Extension::Alnum)
                        .to_uniset()
                        .union(Uniset::single('_' as u32))
                }
                Extension::Space => {
                    Uniset::from_runs(category_runs(GeneralCategoryGroup::SpaceSeparator))
                        .union(Uniset::from_runs(charclasses::LITERAL_WHITESPACE.to_vec()))
                }
            },
            PropertyClass::Any => Uniset::all(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_categories_case_sensitively() {
        assert!(matches!(resolve("Lu"), Some(PropertyClass::Category(_))));
        assert!(matches!(resolve("Nd"), Some(PropertyClass::Category(_))));
        assert!(matches!(resolve("L"), Some(PropertyClass::Category(_))));
        // "lu" is not a category; nothing else matches it either.
        assert!(resolve("lu").is_none());
    }

    #[test]
    fn resolves_extensions_blocks_scripts() {
        assert_eq!(
            resolve("Xwd"),
            Some(PropertyClass::Extension(Extension::Word))
        );
        assert!(matches!(resolve("Basic Latin"), Some(PropertyClass::Block(_))));
        assert!(matches!(resolve("basic-latin"), Some(PropertyClass::Block(_))));
        assert!(matches!(resolve("Greek"), Some(PropertyClass::Script(_))));
        assert!(resolve("NoSuchThing").is_none());
        assert_eq!(resolve("Any"), Some(PropertyClass::Any));
    }

    #[test]
    fn category_membership() {
        let upper = resolve("Lu").expect("category");
        assert!(upper.contains('A' as u32));
        assert!(!upper.contains('a' as u32));
        let digits = resolve("Nd").expect("category");
        assert!(digits.contains('7' as u32));
        assert!(!digits.contains('x' as u32));
    }

    #[test]
    fn extension_membership() {
        let word = PropertyClass::Extension(Extension::Word);
        for c in ['a', 'Z', '0', '_', 'é'] {
            assert!(word.contains(c as u32), "expected word char {:?}", c);
        }
        assert!(!word.contains('-' as u32));

        let space = PropertyClass::Extension(Extension::Space);
        for c in [' ', '\t', '\n', '\u{00A0}'] {
            assert!(space.contains(c as u32), "expected space char {:?}", c);
        }
        assert!(!space.contains('x' as u32));
    }

    #[test]
    fn unisets_agree_with_membership() {
        for name in ["Lu", "Nd", "Xwd", "Greek"] {
            let class = resolve(name).expect("known class");
            let set = class.to_uniset();
            for cp in ['A' as u32, 'z' as u32, '5' as u32, '_' as u32, 0x391] {
                assert_eq!(
                    set.contains(cp),
                    class.contains(cp),
                    "{} disagrees at {:#x}",
                    name,
                    cp
                );
            }
        }
    }
}
