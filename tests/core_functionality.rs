use std::collections::BTreeMap;
use std::sync::Arc;

use segroute::{Router, RouterError, Value};
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn setup_tracing_for_tests() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::TRACE)
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::TRACE.into()))
        .with_test_writer()
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

fn add(
    router: &mut Router<&'static str>,
    path: &str,
    handler: &'static str,
    methods: Option<&[&str]>,
) {
    router
        .add(path, handler, methods, None, BTreeMap::new(), false, false, false, false)
        .unwrap();
}

#[test]
fn static_routes_resolve_by_method() {
    setup_tracing_for_tests();
    let mut router: Router<&str> = Router::new('/');
    add(&mut router, "/home", "home_data", Some(&["GET"]));
    add(&mut router, "/submit", "submit_data", Some(&["POST"]));
    router.finalize().unwrap();

    let home = router.resolve("/home", "GET").unwrap();
    assert_eq!(home.handler, "home_data");
    assert!(home.params.is_empty());

    let submit = router.resolve("/submit", "POST").unwrap();
    assert_eq!(submit.handler, "submit_data");

    let err = router.resolve("/submit", "GET").unwrap_err();
    assert!(matches!(err, RouterError::NoMethod { .. }));
}

#[test]
fn dynamic_int_parameter_is_cast() {
    let mut router: Router<&str> = Router::new('/');
    add(&mut router, "/users/<id:int>", "get_user", None);
    router.finalize().unwrap();

    let resolved = router.resolve("/users/42", "GET").unwrap();
    assert_eq!(resolved.handler, "get_user");
    assert_eq!(resolved.params.get("id"), Some(&Value::Int(42)));

    let err = router.resolve("/users/not-a-number", "GET").unwrap_err();
    assert!(matches!(err, RouterError::NotFound { .. }));
}

#[test]
fn static_segments_take_priority_over_dynamic_siblings() {
    let mut router: Router<&str> = Router::new('/');
    add(&mut router, "/users/me", "current_user", None);
    add(&mut router, "/users/<id:int>", "get_user", None);
    router.finalize().unwrap();

    let me = router.resolve("/users/me", "GET").unwrap();
    assert_eq!(me.handler, "current_user");
    assert!(me.params.is_empty());

    let other = router.resolve("/users/7", "GET").unwrap();
    assert_eq!(other.handler, "get_user");
    assert_eq!(other.params.get("id"), Some(&Value::Int(7)));
}

#[test]
fn path_parameter_spans_multiple_segments() {
    let mut router: Router<&str> = Router::new('/');
    add(&mut router, "/api/<version:int>/hello_world/<foo:path>", "greet", None);
    router.finalize().unwrap();

    let resolved = router.resolve("/api/3/hello_world/a/random/path", "GET").unwrap();
    assert_eq!(resolved.handler, "greet");
    assert_eq!(resolved.params.get("version"), Some(&Value::Int(3)));
    assert_eq!(resolved.params.get("foo"), Some(&Value::Path("a/random/path".to_string())));
}

#[test]
fn non_strict_routes_ignore_trailing_slash() {
    let mut router: Router<&str> = Router::new('/');
    add(&mut router, "/profile", "profile", None);
    router.finalize().unwrap();

    assert_eq!(router.resolve("/profile/", "GET").unwrap().handler, "profile");
    assert_eq!(router.resolve("/profile", "GET").unwrap().handler, "profile");
}

#[test]
fn strict_routes_distinguish_trailing_slash() {
    let mut router: Router<&str> = Router::new('/');
    router
        .add(
            "/profile/",
            "profile_with_slash",
            None,
            None,
            BTreeMap::new(),
            true,
            false,
            false,
            false,
        )
        .unwrap();
    router.finalize().unwrap();

    assert_eq!(router.resolve("/profile/", "GET").unwrap().handler, "profile_with_slash");
    assert!(router.resolve("/profile", "GET").is_err());
}

#[test]
fn requirements_disambiguate_same_path_same_method() {
    let mut router: Router<&str> = Router::new('/');
    router
        .add(
            "/content",
            "content_en",
            None,
            None,
            BTreeMap::from([("lang".to_string(), "en".to_string())]),
            false,
            false,
            false,
            false,
        )
        .unwrap();
    router
        .add(
            "/content",
            "content_fr",
            None,
            None,
            BTreeMap::from([("lang".to_string(), "fr".to_string())]),
            false,
            false,
            false,
            true,
        )
        .unwrap();
    router.finalize().unwrap();

    let fr = router
        .resolve_with_requirements(
            "/content",
            "GET",
            &BTreeMap::from([("lang".to_string(), "fr".to_string())]),
        )
        .unwrap();
    assert_eq!(fr.handler, "content_fr");

    let en = router
        .resolve_with_requirements(
            "/content",
            "GET",
            &BTreeMap::from([("lang".to_string(), "en".to_string())]),
        )
        .unwrap();
    assert_eq!(en.handler, "content_en");
}

#[test]
fn ext_parameter_splits_name_and_extension() {
    let mut router: Router<&str> = Router::new('/');
    add(&mut router, "/static/<name:ext=jpg|png>", "serve_image", None);
    router.finalize().unwrap();

    let resolved = router.resolve("/static/photo.jpg", "GET").unwrap();
    assert_eq!(resolved.handler, "serve_image");
    assert_eq!(resolved.params.get("name"), Some(&Value::Str("photo".to_string())));
    assert_eq!(resolved.params.get("ext"), Some(&Value::Str("jpg".to_string())));

    assert!(router.resolve("/static/photo.gif", "GET").is_err());
}

#[test]
fn custom_pattern_can_be_registered() {
    let mut router: Router<&str> = Router::new('/');
    router
        .register_pattern(
            "hex",
            Arc::new(|s: &str| {
                i64::from_str_radix(s, 16).map(segroute::Value::Int).map_err(|e| e.to_string())
            }),
            r"^[0-9a-fA-F]+$",
        )
        .unwrap();
    add(&mut router, "/color/<code:hex>", "get_color", None);
    router.finalize().unwrap();

    let resolved = router.resolve("/color/ff00aa", "GET").unwrap();
    assert_eq!(resolved.params.get("code"), Some(&Value::Int(0xff00aa)));
}

#[test]
fn duplicate_route_without_overwrite_is_rejected() {
    let mut router: Router<&str> = Router::new('/');
    add(&mut router, "/dup", "first", Some(&["GET"]));
    let err = router.add(
        "/dup",
        "second",
        Some(&["GET"]),
        None,
        BTreeMap::new(),
        false,
        false,
        false,
        false,
    );
    assert!(matches!(err, Err(RouterError::RouteExists { .. })));
}

#[test]
fn overwrite_replaces_the_conflicting_route() {
    let mut router: Router<&str> = Router::new('/');
    add(&mut router, "/dup", "first", Some(&["GET"]));
    router
        .add("/dup", "second", Some(&["GET"]), None, BTreeMap::new(), false, false, true, false)
        .unwrap();
    router.finalize().unwrap();

    assert_eq!(router.resolve("/dup", "GET").unwrap().handler, "second");
}

#[test]
fn bad_method_is_rejected_when_allowed_methods_configured() {
    let mut router: Router<&str> = Router::with_allowed_methods('/', Router::<&str>::standard_http_methods());
    let err = router.add(
        "/x",
        "x",
        Some(&["TRACE"]),
        None,
        BTreeMap::new(),
        false,
        false,
        false,
        false,
    );
    assert!(matches!(err, Err(RouterError::BadMethod { .. })));
}

#[test]
fn default_router_restricts_to_the_standard_method_set() {
    let mut router: Router<&str> = Router::new('/');
    let err = router.add(
        "/x",
        "x",
        Some(&["PURGE"]),
        None,
        BTreeMap::new(),
        false,
        false,
        false,
        false,
    );
    assert!(matches!(err, Err(RouterError::BadMethod { .. })));

    router
        .add("/y", "y", Some(&["CONNECT"]), None, BTreeMap::new(), false, false, false, false)
        .unwrap();
}

#[test]
fn unrestricted_router_accepts_any_method_string() {
    let mut router: Router<&str> = Router::unrestricted('/');
    router
        .add("/x", "x", Some(&["PURGE"]), None, BTreeMap::new(), false, false, false, false)
        .unwrap();
    router.finalize().unwrap();
    assert_eq!(router.resolve("/x", "PURGE").unwrap().handler, "x");
}

#[test]
fn finalize_then_reset_allows_adding_routes_again() {
    let mut router: Router<&str> = Router::new('/');
    add(&mut router, "/one", "one", None);
    router.finalize().unwrap();
    assert_eq!(router.resolve("/one", "GET").unwrap().handler, "one");

    router.reset().unwrap();
    add(&mut router, "/two", "two", None);
    router.finalize().unwrap();

    assert_eq!(router.resolve("/one", "GET").unwrap().handler, "one");
    assert_eq!(router.resolve("/two", "GET").unwrap().handler, "two");
}

#[test]
fn cannot_finalize_twice_or_add_after_finalize() {
    let mut router: Router<&str> = Router::new('/');
    add(&mut router, "/one", "one", None);
    router.finalize().unwrap();

    assert!(matches!(router.finalize(), Err(RouterError::FinalizationError(_))));
    assert!(matches!(
        router.add("/two", "two", None, None, BTreeMap::new(), false, false, false, false),
        Err(RouterError::FinalizationError(_))
    ));
}

#[test]
fn delimiter_spanning_parameter_must_be_the_last_segment() {
    let mut router: Router<&str> = Router::new('/');
    let err = router.add(
        "/files/<rest:path>/download",
        "bad",
        None,
        None,
        BTreeMap::new(),
        false,
        false,
        false,
        false,
    );
    assert!(matches!(err, Err(RouterError::InvalidUsage(_))));

    let err = router.add(
        "/files/<rest:[a-z]+/[0-9]+>/download",
        "bad_custom",
        None,
        None,
        BTreeMap::new(),
        false,
        false,
        false,
        false,
    );
    assert!(matches!(err, Err(RouterError::InvalidUsage(_))));
}

#[test]
fn duplicate_parameter_name_in_one_route_is_rejected() {
    let mut router: Router<&str> = Router::new('/');
    let err = router.add(
        "/users/<id:int>/posts/<id:int>",
        "dup_id",
        None,
        None,
        BTreeMap::new(),
        false,
        false,
        false,
        false,
    );
    assert!(matches!(err, Err(RouterError::ParameterNameConflicts { .. })));
}

#[test]
fn not_found_for_unregistered_path() {
    let mut router: Router<&str> = Router::new('/');
    add(&mut router, "/known", "known", None);
    router.finalize().unwrap();

    assert!(matches!(router.resolve("/unknown", "GET"), Err(RouterError::NotFound { .. })));
}

#[test]
fn untyped_and_typed_dynamic_siblings_pick_by_specificity() {
    let mut router: Router<&str> = Router::new('/');
    add(&mut router, "/foo/<bar>", "bar_str", None);
    add(&mut router, "/foo/<bar:int>", "bar_int", None);
    router.finalize().unwrap();

    let as_string = router.resolve("/foo/something", "GET").unwrap();
    assert_eq!(as_string.handler, "bar_str");
    assert_eq!(as_string.params.get("bar"), Some(&Value::Str("something".to_string())));

    let as_int = router.resolve("/foo/111", "GET").unwrap();
    assert_eq!(as_int.handler, "bar_int");
    assert_eq!(as_int.params.get("bar"), Some(&Value::Int(111)));
}

#[test]
fn four_typed_siblings_dispatch_to_their_own_route() {
    let mut router: Router<&str> = Router::new('/');
    add(&mut router, "/<test:str>", "as_str", None);
    add(&mut router, "/<test:int>", "as_int", None);
    add(&mut router, "/<test:uuid>", "as_uuid", None);
    add(&mut router, "/<test:ymd>", "as_ymd", None);
    router.finalize().unwrap();

    let r = router.resolve("/foo", "GET").unwrap();
    assert_eq!(r.handler, "as_str");
    assert_eq!(r.params.get("test"), Some(&Value::Str("foo".to_string())));

    let r = router.resolve("/123", "GET").unwrap();
    assert_eq!(r.handler, "as_int");
    assert_eq!(r.params.get("test"), Some(&Value::Int(123)));

    let r = router.resolve("/726a7d33-4bd5-46a3-a02d-37da7b4b029b", "GET").unwrap();
    assert_eq!(r.handler, "as_uuid");
    assert!(matches!(r.params.get("test"), Some(Value::Uuid(_))));

    let r = router.resolve("/2021-03-21", "GET").unwrap();
    assert_eq!(r.handler, "as_ymd");
    match r.params.get("test").unwrap() {
        Value::Date(d) => assert_eq!(d.to_string(), "2021-03-21"),
        other => panic!("expected Date, got {other:?}"),
    }
}

#[test]
fn path_typed_route_competes_with_a_more_specific_prefix_route() {
    let mut router: Router<&str> = Router::new('/');
    router
        .add(
            "/<foo:path>",
            "catch_all",
            Some(&["GET", "OPTIONS"]),
            None,
            BTreeMap::new(),
            false,
            false,
            false,
            false,
        )
        .unwrap();
    add(
        &mut router,
        "/api/<version:int>/hello_world/<foo:path>",
        "greet",
        Some(&["GET"]),
    );
    router.finalize().unwrap();

    let greet = router.resolve("/api/3/hello_world/a/random/path", "GET").unwrap();
    assert_eq!(greet.handler, "greet");
    assert_eq!(greet.params.get("version"), Some(&Value::Int(3)));
    assert_eq!(greet.params.get("foo"), Some(&Value::Path("a/random/path".to_string())));

    let caught = router.resolve("/a/random/path", "OPTIONS").unwrap();
    assert_eq!(caught.handler, "catch_all");
    assert_eq!(caught.params.get("foo"), Some(&Value::Path("a/random/path".to_string())));
}

#[test]
fn trailing_delimiter_retry_lands_on_requirements_qualified_route() {
    let mut router: Router<&str> = Router::new('/');
    router
        .add(
            "/test",
            "test_foo",
            None,
            None,
            BTreeMap::from([("req".to_string(), "foo".to_string())]),
            false,
            false,
            false,
            false,
        )
        .unwrap();
    router
        .add(
            "/test",
            "test_bar",
            None,
            None,
            BTreeMap::from([("req".to_string(), "bar".to_string())]),
            false,
            false,
            false,
            true,
        )
        .unwrap();
    add(&mut router, "/test/ing", "test_ing", None);
    router.finalize().unwrap();

    let resolved = router
        .resolve_with_requirements(
            "/test/",
            "GET",
            &BTreeMap::from([("req".to_string(), "bar".to_string())]),
        )
        .unwrap();
    assert_eq!(resolved.handler, "test_bar");
}

#[test]
fn unquote_controls_percent_decoding_of_captures() {
    let raw_encoded = router_for_unquote(false);
    let resolved = raw_encoded.resolve("/%F0%9F%98%8E/sunglasses", "GET").unwrap();
    assert_eq!(resolved.params.get("foo"), Some(&Value::Str("%F0%9F%98%8E".to_string())));

    let decoded = router_for_unquote(true);
    let resolved = decoded.resolve("/%F0%9F%98%8E/sunglasses", "GET").unwrap();
    assert_eq!(resolved.params.get("foo"), Some(&Value::Str("\u{1F60E}".to_string())));
}

fn router_for_unquote(unquote: bool) -> Router<&'static str> {
    let mut router: Router<&str> = Router::new('/');
    router
        .add("/<foo>/<bar>", "emoji", None, None, BTreeMap::new(), false, unquote, false, false)
        .unwrap();
    router.finalize().unwrap();
    router
}

#[test]
fn uuid_and_date_types_cast_correctly() {
    let mut router: Router<&str> = Router::new('/');
    add(&mut router, "/events/<day:ymd>/by/<tid:uuid>", "show_event", None);
    router.finalize().unwrap();

    let resolved =
        router.resolve("/events/2024-02-29/by/726a7d33-4bd5-46a3-a02d-37da7b4b029b", "GET").unwrap();
    match resolved.params.get("day").unwrap() {
        Value::Date(d) => assert_eq!(d.to_string(), "2024-02-29"),
        other => panic!("expected Date, got {other:?}"),
    }
    assert!(matches!(resolved.params.get("tid"), Some(Value::Uuid(_))));
}

#[test]
fn custom_delimiter_spanning_regex_captures_its_full_declared_body() {
    let mut router: Router<&str> = Router::new('/');
    add(&mut router, "/foo/<bar:[a-z]+/[0-9]+>", "custom_regex", None);
    router.finalize().unwrap();

    let resolved = router.resolve("/foo/abc/123", "GET").unwrap();
    assert_eq!(resolved.handler, "custom_regex");
    assert_eq!(resolved.params.get("bar"), Some(&Value::Str("abc/123".to_string())));

    let err = router.resolve("/foo/abc/not-digits", "GET").unwrap_err();
    assert!(matches!(err, RouterError::NotFound { .. }));
}

#[test]
fn registered_type_wins_over_custom_regex_with_same_param_name() {
    let mut router: Router<&str> = Router::new('/');
    add(&mut router, "/items/<id:int>", "by_int", None);
    add(&mut router, "/items/<id:[0-9]+>", "by_custom_regex", None);
    router.finalize().unwrap();

    let resolved = router.resolve("/items/42", "GET").unwrap();
    assert_eq!(resolved.handler, "by_int");
    assert_eq!(resolved.params.get("id"), Some(&Value::Int(42)));
}

#[test]
fn custom_regex_with_internal_capturing_group_is_rejected() {
    let mut router: Router<&str> = Router::new('/');
    let err = router
        .add("/items/<a:(x)(y)>/<b:int>", "handler", None, None, BTreeMap::new(), false, false, false, false)
        .unwrap_err();
    assert!(matches!(err, RouterError::InvalidUsage(_)));
}
