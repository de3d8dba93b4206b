use pretty_assertions::assert_eq;
use rstest::rstest;

use remerge_core::{
    ArtifactKind, MergeError, Merger, Side, merge_app_file, merge_barrel_file, merge_handler_file,
    merge_imports, merge_test_file,
};

const HANDLERS_EXISTING: &str = r#"import type { RouteHandler } from '@hono/zod-openapi'
import type { aRoute, bRoute } from '../routes'

// returns the A resource, hand-tuned
export const aRouteHandler: RouteHandler<typeof aRoute> = async (c) => {
  return c.json({ a: true }, 200) // keep this comment
}

export const bRouteHandler: RouteHandler<typeof bRoute> = async (c) => {
  return c.json({ b: true }, 200)
}
"#;

const HANDLERS_GENERATED: &str = r#"import type { RouteHandler } from '@hono/zod-openapi'
import type { aRoute, cRoute } from '../routes'

export const aRouteHandler: RouteHandler<typeof aRoute> = async (c) => {}

export const cRouteHandler: RouteHandler<typeof cRoute> = async (c) => {}
"#;

#[test]
fn handler_scenario_keeps_a_adds_c_drops_b() {
    let merged = merge_handler_file(HANDLERS_EXISTING, HANDLERS_GENERATED).unwrap();
    assert_eq!(
        merged,
        r#"import type { RouteHandler } from '@hono/zod-openapi'
import type { aRoute, cRoute } from '../routes'

// returns the A resource, hand-tuned
export const aRouteHandler: RouteHandler<typeof aRoute> = async (c) => {
  return c.json({ a: true }, 200) // keep this comment
}

export const cRouteHandler: RouteHandler<typeof cRoute> = async (c) => {}
"#
    );
}

#[test]
fn imports_scenario_moves_route_to_canonical_module() {
    let merged = merge_imports(
        "import { FooRoute, bar } from './x'\n",
        "import { BazRoute } from './x'\nimport { FooRoute } from './y'\n",
    )
    .unwrap();
    assert_eq!(
        merged,
        vec![
            "import { bar, BazRoute } from './x'".to_string(),
            "import { FooRoute } from './y'".to_string(),
        ]
    );
}

#[test]
fn app_scenario_preserves_user_middleware_in_chain() {
    let existing = "import { app } from './app'\n\nexport const api = app.use(auth).openapi(R1).openapi(R2)\n";
    let generated = "import { app } from './app'\n\nexport const api = app.openapi(R1).openapi(R2).openapi(R3)\n";
    let merged = merge_app_file(existing, generated).unwrap();
    assert_eq!(
        merged,
        "import { app } from './app'\n\nexport const api = app.use(auth).openapi(R1).openapi(R2).openapi(R3)\n"
    );
}

#[test]
fn test_scenario_swaps_route_blocks() {
    let existing = "describe('GET /x', () => {\n  it('ok', () => {})\n})\n";
    let generated = "describe('POST /y', () => {\n  it('ok', () => {})\n})\n";
    let merged = merge_test_file(existing, generated).unwrap();
    assert!(merged.contains("POST /y"));
    assert!(!merged.contains("GET /x"));
}

#[test]
fn barrel_is_regenerated() {
    assert_eq!(merge_barrel_file("old", "export * from './a'\n"), "export * from './a'\n");
}

const INLINE_EXISTING: &str = r#"import { OpenAPIHono } from '@hono/zod-openapi'
import { getUserRoute, deleteUserRoute } from '../routes'

const app = new OpenAPIHono()

export const userHandler = app
  .openapi(getUserRoute, async (c) => {
    const id = c.req.param('id')
    return c.json({ id }, 200)
  })
  .openapi(deleteUserRoute, async (c) => c.body(null, 204))
"#;

const INLINE_GENERATED: &str = r#"import { OpenAPIHono } from '@hono/zod-openapi'
import { getUserRoute, postUserRoute } from '../routes'

const app = new OpenAPIHono()

export const userHandler = app
  .openapi(getUserRoute, async (c) => {})
  .openapi(postUserRoute, async (c) => {})
"#;

const TEST_EXISTING: &str = r#"import { describe, expect, it } from 'vitest'
import app from '../app'

describe('users', () => {
  describe('GET /users', () => {
    it('returns users', async () => {
      const res = await app.request('/users')
      expect(res.status).toBe(200)
    })
  })

  describe('DELETE /users/{id}', () => {
    it('deletes', async () => {})
  })
})
"#;

const TEST_GENERATED: &str = r#"import { describe, expect, it } from 'vitest'
import app from '../app'

function mockUser() {
  return { id: '1' }
}

describe('users', () => {
  describe('GET /users', () => {
    it('returns 200', async () => {})
  })

  describe('POST /users', () => {
    it('returns 201', async () => {
      const body = mockUser()
    })
  })
})
"#;

#[rstest]
#[case(ArtifactKind::Handler, HANDLERS_EXISTING, HANDLERS_GENERATED)]
#[case(ArtifactKind::Handler, INLINE_EXISTING, INLINE_GENERATED)]
#[case(ArtifactKind::Handler, "", HANDLERS_GENERATED)]
#[case(ArtifactKind::App, "export const api = app.use(a).openapi(R1)\n", "export const api = app.openapi(R2)\n")]
#[case(ArtifactKind::Test, TEST_EXISTING, TEST_GENERATED)]
#[case(ArtifactKind::Test, "", TEST_GENERATED)]
#[case(ArtifactKind::Barrel, "x", "export * from './a'\n")]
fn merging_twice_is_idempotent(#[case] kind: ArtifactKind, #[case] existing: &str, #[case] generated: &str) {
    let merger = Merger::default();
    let once = merger.merge(kind, existing, generated).unwrap();
    let twice = merger.merge(kind, &once, generated).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn inline_handler_file_merges_calls() {
    let merged = merge_handler_file(INLINE_EXISTING, INLINE_GENERATED).unwrap();
    assert_eq!(
        merged,
        r#"import { OpenAPIHono } from '@hono/zod-openapi'
import { getUserRoute, postUserRoute } from '../routes'

const app = new OpenAPIHono()

export const userHandler = app
  .openapi(getUserRoute, async (c) => {
    const id = c.req.param('id')
    return c.json({ id }, 200)
  })
  .openapi(postUserRoute, async (c) => {})
"#
    );
}

#[test]
fn test_file_keeps_edits_adds_blocks_and_helpers() {
    let merged = merge_test_file(TEST_EXISTING, TEST_GENERATED).unwrap();
    assert!(merged.contains("it('returns users'"), "edited block kept");
    assert!(!merged.contains("returns 200"), "generated text of kept block not used");
    assert!(!merged.contains("DELETE /users/{id}"), "stale block removed");
    assert!(merged.contains("describe('POST /users'"), "new block added");

    let helper = merged.find("function mockUser()").expect("helper inserted");
    let first_block = merged.find("describe('GET /users'").unwrap();
    assert!(helper < first_block);
    assert!(merged.trim_end().ends_with("})"));
}

#[test]
fn broken_existing_file_is_an_error_not_a_silent_overwrite() {
    let err = merge_handler_file("export const aRouteHandler = (c => {\n", HANDLERS_GENERATED).unwrap_err();
    match err {
        MergeError::Parse { side, .. } => assert_eq!(side, Side::Existing),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn header_comments_and_code_between_imports_survive() {
    let existing = r#"// @ts-nocheck
// Copyright ACME
import type { RouteHandler } from '@hono/zod-openapi'
// local constant, hand-written
export const keep = 1
import type { aRoute, bRoute } from '../routes'

export const aRouteHandler: RouteHandler<typeof aRoute> = async (c) => c.text('a')

export const bRouteHandler: RouteHandler<typeof bRoute> = async (c) => c.text('b')
"#;
    let generated = r#"import type { RouteHandler } from '@hono/zod-openapi'
import type { aRoute } from '../routes'

export const aRouteHandler: RouteHandler<typeof aRoute> = async (c) => {}
"#;
    let merged = merge_handler_file(existing, generated).unwrap();
    assert!(merged.starts_with("// @ts-nocheck\n// Copyright ACME\nimport "), "{merged}");
    assert!(merged.contains("// local constant, hand-written\nexport const keep = 1\n"), "{merged}");
    assert!(merged.contains("c.text('a')"));
    assert!(!merged.contains("bRouteHandler"));
    assert_eq!(merge_handler_file(&merged, generated).unwrap(), merged);
}

#[test]
fn first_run_keeps_generated_header() {
    let generated = format!("// Generated by remerge, edit freely\n{HANDLERS_GENERATED}");
    let merged = merge_handler_file("", &generated).unwrap();
    assert!(merged.starts_with("// Generated by remerge, edit freely\nimport type { RouteHandler }"), "{merged}");
    assert_eq!(merge_handler_file(&merged, &generated).unwrap(), merged);
}

#[test]
fn parentheses_in_handler_strings_survive_repeated_merges() {
    let existing = r#"import { OpenAPIHono } from '@hono/zod-openapi'
import { getUserRoute } from '../routes'

const app = new OpenAPIHono()

export const userHandler = app
  .openapi(getUserRoute, (c) => c.text('smile :)'))
"#;
    let generated = INLINE_GENERATED;
    let once = merge_handler_file(existing, generated).unwrap();
    assert!(once.contains(".openapi(getUserRoute, (c) => c.text('smile :)'))\n  .openapi(postUserRoute"), "{once}");
    let twice = merge_handler_file(&once, generated).expect("merged output parses");
    assert_eq!(twice, once);
}

#[test]
fn hand_written_edge_case_tests_are_not_route_blocks() {
    let existing = format!(
        "{TEST_EXISTING}\ndescribe('edge cases', () => {{\n  it('GET /users with bad id returns 400', async () => {{}})\n}})\n"
    );
    let merged = merge_test_file(&existing, TEST_GENERATED).unwrap();
    assert!(merged.contains("it('GET /users with bad id returns 400'"), "{merged}");
    assert_eq!(merge_test_file(&merged, TEST_GENERATED).unwrap(), merged);
}
