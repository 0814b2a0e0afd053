//! Property tests for the appended documentation block.

use fob_docgen::{
    ComponentDoc, DocgenCodeBlock, DocgenCodeGenerator, GenerateOptions, GenerateRequest,
    PropItem, PropItemType, SourceLocation,
};
use proptest::prelude::*;

fn component_strategy() -> impl Strategy<Value = ComponentDoc> {
    (
        "[A-Z][A-Za-z0-9]{0,12}",
        "[^\\x00]{0,40}",
        prop::collection::vec(("[a-z][A-Za-z]{0,8}", prop::bool::ANY), 0..=5),
    )
        .prop_map(|(name, description, props)| {
            let mut doc = ComponentDoc::new(
                name.clone(),
                name,
                "/project/src/Component.tsx",
                SourceLocation::new(1, 1),
            );
            doc.description = description;
            for (prop, required) in props {
                doc.add_prop(PropItem::new(prop, PropItemType::named("string"), required));
            }
            doc
        })
}

fn options_strategy() -> impl Strategy<Value = GenerateOptions> {
    (
        prop::bool::ANY,
        prop::option::of("[A-Z_]{1,20}"),
    )
        .prop_map(|(set_display_name, docgen_collection_name)| GenerateOptions {
            set_display_name,
            type_prop_name: "type".to_string(),
            docgen_collection_name,
        })
}

fn generate(source: &str, components: &[ComponentDoc], options: &GenerateOptions) -> String {
    DocgenCodeBlock::new("/project")
        .generate(GenerateRequest {
            id: "/project/src/Component.tsx",
            source,
            components,
            options,
        })
        .expect("generation should succeed")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// The original text is never altered, only extended.
    #[test]
    fn prop_output_extends_source(
        source in "\\PC{0,200}",
        components in prop::collection::vec(component_strategy(), 1..=4),
        options in options_strategy(),
    ) {
        let output = generate(&source, &components, &options);
        prop_assert!(output.starts_with(&source));
        prop_assert!(output.len() > source.len());
    }

    /// Regenerating from identical input is byte-identical.
    #[test]
    fn prop_generation_is_deterministic(
        source in "\\PC{0,200}",
        components in prop::collection::vec(component_strategy(), 1..=4),
        options in options_strategy(),
    ) {
        let first = generate(&source, &components, &options);
        let second = generate(&source, &components, &options);
        prop_assert_eq!(first, second);
    }

    /// One guarded block per component.
    #[test]
    fn prop_one_block_per_component(
        components in prop::collection::vec(component_strategy(), 1..=4),
        options in options_strategy(),
    ) {
        let output = generate("", &components, &options);
        prop_assert_eq!(
            output.matches("catch (__react_docgen_typescript_loader_error) { }").count(),
            components.len()
        );
        for component in &components {
            let assignment = format!("    {}.__docgenInfo = ", component.expression);
            prop_assert!(output.contains(&assignment));
        }
    }
}
