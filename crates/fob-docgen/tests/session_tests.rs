use std::fs;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use fob_docgen::{
    ComponentDocParser, ExtractorOptions, Options, ReactDocgenParser, SessionError,
    TypeAnalysisSession, resolve,
};
use tempfile::TempDir;

const TSCONFIG: &str = r#"{
    // comments and trailing commas are accepted
    "compilerOptions": { "jsx": "react-jsx", "strict": true, },
    "include": ["src/**/*"],
}"#;

const TYPES: &str = r#"
export interface ButtonProps {
    /** Text shown inside the button */
    label: string;
}
"#;

const BUTTON: &str = r#"
import { ButtonProps } from "./types";

export const Button = (props: ButtonProps) => <button>{props.label}</button>;
"#;

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent");
    }
    fs::write(path, contents).expect("write file");
}

fn create_project() -> TempDir {
    let dir = TempDir::new().expect("temp dir");
    write(dir.path(), "tsconfig.json", TSCONFIG);
    write(dir.path(), "src/types.ts", TYPES);
    write(dir.path(), "src/Button.tsx", BUTTON);
    dir
}

fn session_for(dir: &TempDir) -> TypeAnalysisSession {
    TypeAnalysisSession::without_watcher(dir.path(), &resolve(Options::default()))
        .expect("session should build")
}

fn watched_session_for(root: &Path) -> TypeAnalysisSession {
    let session = TypeAnalysisSession::new(root, &resolve(Options::default()))
        .expect("session should build");
    assert!(session.is_watching());
    session
}

/// Poll `condition` until it holds or ten seconds pass.
fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(50));
    }
    condition()
}

const TYPES_WITH_SIZE: &str = r#"
export interface ButtonProps {
    /** Text shown inside the button */
    label: string;
    /** Visual size */
    size?: "small" | "large";
}
"#;

fn prop_names(session: &TypeAnalysisSession, file: &Path) -> Vec<String> {
    let parser = ReactDocgenParser::new(ExtractorOptions::default());
    let provider = session.program_provider();
    let docs = parser
        .parse_with_program_provider(file, &provider)
        .expect("extraction should succeed");
    assert_eq!(docs.len(), 1);
    docs[0].props.keys().cloned().collect()
}

#[test]
fn missing_config_is_a_fatal_error() {
    let dir = TempDir::new().expect("temp dir");
    let config = resolve(Options::new().with_tsconfig_path("tsconfig.does-not-exist.json"));

    let error = TypeAnalysisSession::without_watcher(dir.path(), &config).unwrap_err();

    assert!(matches!(error, SessionError::TsconfigNotFound { .. }));
    let message = error.to_string();
    assert!(message.starts_with("tsconfig.json not found"));
    assert!(message.contains("tsconfig.does-not-exist.json"));
}

#[test]
fn discovers_project_members() {
    let project = create_project();
    write(project.path(), "node_modules/lib/index.d.ts", "export {};");
    write(project.path(), "scripts/build.ts", "export {};");

    let session = session_for(&project);
    let program = session.current_program();

    assert_eq!(session.config_path(), project.path().join("tsconfig.json"));
    assert_eq!(program.len(), 2);
    assert!(program.contains(&project.path().join("src/Button.tsx")));
    assert!(program.contains(&project.path().join("src/types.ts")));
    assert!(program.compiler_options().strict_null_checks_enabled());
    assert_eq!(program.compiler_options().no_emit, Some(true));
}

#[test]
fn extends_chain_and_overrides_are_layered() {
    let project = TempDir::new().expect("temp dir");
    write(
        project.path(),
        "tsconfig.base.json",
        r#"{ "compilerOptions": { "strict": true, "jsx": "preserve" } }"#,
    );
    write(
        project.path(),
        "tsconfig.json",
        r#"{ "extends": "./tsconfig.base.json", "compilerOptions": { "jsx": "react-jsx" } }"#,
    );
    write(project.path(), "src/Button.tsx", BUTTON);

    let overrides = fob_docgen::CompilerOptions {
        strict: Some(false),
        ..Default::default()
    };
    let config = resolve(Options::new().with_compiler_options(overrides));
    let session = TypeAnalysisSession::without_watcher(project.path(), &config)
        .expect("session should build");
    let options = session.current_program().compiler_options().clone();

    assert_eq!(options.jsx.as_deref(), Some("react-jsx"));
    assert_eq!(options.module.as_deref(), Some("commonjs"));
    assert!(!options.strict_null_checks_enabled());
}

#[test]
fn type_edits_are_visible_after_refresh() {
    let project = create_project();
    let session = session_for(&project);
    let button = project.path().join("src/Button.tsx");

    assert_eq!(prop_names(&session, &button), vec!["label"]);
    let before = session.current_program().version();

    let types = project.path().join("src/types.ts");
    fs::write(&types, TYPES_WITH_SIZE).expect("rewrite types");
    session.refresh_file(&types).expect("refresh");

    assert!(session.current_program().version() > before);
    assert_eq!(prop_names(&session, &button), vec!["label", "size"]);
}

#[test]
fn provider_sees_snapshots_published_after_it_was_created() {
    let project = create_project();
    let session = session_for(&project);
    let provider = session.program_provider();
    let card = project.path().join("src/Card.tsx");

    assert!(!provider().contains(&card));

    write(
        project.path(),
        "src/Card.tsx",
        "export function Card() { return <div />; }",
    );
    session.refresh_file(&card).expect("refresh");

    assert!(provider().contains(&card));
}

#[test]
fn deleted_members_leave_the_program() {
    let project = create_project();
    let session = session_for(&project);
    let button = project.path().join("src/Button.tsx");

    fs::remove_file(&button).expect("remove");
    session.refresh_file(&button).expect("refresh");

    assert!(!session.current_program().contains(&button));
}

#[test]
fn files_outside_the_project_are_ignored() {
    let project = create_project();
    let session = session_for(&project);
    write(project.path(), "scripts/build.ts", "export {};");
    let version = session.current_program().version();

    session
        .refresh_file(&project.path().join("scripts/build.ts"))
        .expect("refresh");

    assert_eq!(session.current_program().version(), version);
}

#[test]
fn config_changes_rebuild_the_program() {
    let project = create_project();
    write(
        project.path(),
        "lib/Card.tsx",
        "export function Card() { return <div />; }",
    );
    let session = session_for(&project);
    let card = project.path().join("lib/Card.tsx");
    assert!(!session.current_program().contains(&card));

    let tsconfig = project.path().join("tsconfig.json");
    fs::write(
        &tsconfig,
        r#"{ "compilerOptions": { "strict": true }, "include": ["src/**/*", "lib/**/*"] }"#,
    )
    .expect("rewrite tsconfig");
    session.refresh_file(&tsconfig).expect("refresh");

    assert!(session.current_program().contains(&card));
}

#[test]
fn malformed_config_is_reported() {
    let project = TempDir::new().expect("temp dir");
    write(project.path(), "tsconfig.json", "{ \"compilerOptions\": ");

    let error = TypeAnalysisSession::without_watcher(project.path(), &resolve(Options::default()))
        .unwrap_err();

    assert!(matches!(error, SessionError::InvalidTsconfig { .. }));
}

#[test]
fn watcher_applies_type_edits_on_its_own() {
    let project = create_project();
    let session = watched_session_for(project.path());
    let button = project.path().join("src/Button.tsx");
    assert_eq!(prop_names(&session, &button), vec!["label"]);

    fs::write(project.path().join("src/types.ts"), TYPES_WITH_SIZE).expect("rewrite types");

    assert!(eventually(|| prop_names(&session, &button) == ["label", "size"]));
}

#[test]
fn watcher_covers_members_outside_the_config_directory() {
    let root = TempDir::new().expect("temp dir");
    write(
        root.path(),
        "app/tsconfig.json",
        r#"{ "compilerOptions": { "jsx": "react-jsx" }, "include": ["src", "../shared"] }"#,
    );
    write(root.path(), "shared/types.ts", TYPES);
    write(
        root.path(),
        "app/src/Button.tsx",
        &BUTTON.replace("\"./types\"", "\"../../shared/types\""),
    );
    let session = watched_session_for(&root.path().join("app"));
    let button = root.path().join("app/src/Button.tsx");
    assert_eq!(prop_names(&session, &button), vec!["label"]);

    fs::write(root.path().join("shared/types.ts"), TYPES_WITH_SIZE).expect("rewrite types");

    assert!(eventually(|| prop_names(&session, &button) == ["label", "size"]));
}

#[test]
fn watcher_reloads_when_an_inherited_config_changes() {
    let root = TempDir::new().expect("temp dir");
    write(
        root.path(),
        "tsconfig.base.json",
        r#"{ "compilerOptions": { "strict": false } }"#,
    );
    write(
        root.path(),
        "app/tsconfig.json",
        r#"{ "extends": "../tsconfig.base.json", "include": ["src"] }"#,
    );
    write(root.path(), "app/src/Button.tsx", BUTTON);
    let session = watched_session_for(&root.path().join("app"));
    assert!(!session.current_program().compiler_options().strict_null_checks_enabled());

    fs::write(
        root.path().join("tsconfig.base.json"),
        r#"{ "compilerOptions": { "strict": true } }"#,
    )
    .expect("rewrite base config");

    assert!(eventually(|| {
        session.current_program().compiler_options().strict_null_checks_enabled()
    }));
}

#[test]
fn watcher_follows_new_directories() {
    let project = create_project();
    let session = watched_session_for(project.path());
    let widgets = project.path().join("src/widgets");

    fs::create_dir(&widgets).expect("create directory");
    assert!(eventually(|| session.watched_directories().contains(&widgets)));

    let card = widgets.join("Card.tsx");
    fs::write(&card, "export function Card() { return <div />; }").expect("write card");

    assert!(eventually(|| session.current_program().contains(&card)));
}

#[test]
fn watcher_skips_dependency_directories() {
    let project = create_project();
    write(project.path(), "node_modules/react/index.d.ts", "export {};");
    write(
        project.path(),
        "tsconfig.json",
        r#"{ "compilerOptions": { "jsx": "react-jsx" } }"#,
    );
    let session = watched_session_for(project.path());

    let watched = session.watched_directories();
    assert!(watched.contains(&project.path().join("src")));
    assert!(!watched.iter().any(|dir| dir.ends_with("node_modules")));
}
