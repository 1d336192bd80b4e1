use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use flango::{value, ErrorKind, Loader, Value};

fn loader(templates: &[(&str, &str)]) -> Loader {
    let templates: HashMap<PathBuf, String> = templates
        .iter()
        .map(|(name, source)| (Path::new("/t").join(name), source.to_string()))
        .collect();
    Loader::builder("/t")
        .autoescape(false)
        .reader(move |path| {
            templates
                .get(path)
                .cloned()
                .ok_or_else(|| io::ErrorKind::NotFound.into())
        })
        .build()
}

fn render(loader: &Loader, name: &str, ctx: Value) -> String {
    loader.load(name).unwrap().render_from(&ctx).unwrap()
}

const BASE: &str = "<h1>{% block body %}default{% endblock %}</h1>";

#[test]
fn extends_override_block() {
    let loader = loader(&[
        ("base.html", BASE),
        (
            "child.html",
            "{% extends 'base.html' %}{% block body %}override{% endblock %}",
        ),
    ]);
    assert_eq!(render(&loader, "child.html", value! {}), "<h1>override</h1>");
}

#[test]
fn extends_without_override_keeps_default() {
    let loader = loader(&[
        ("base.html", BASE),
        ("child.html", "{% extends \"base.html\" %}"),
    ]);
    assert_eq!(render(&loader, "child.html", value! {}), "<h1>default</h1>");
}

#[test]
fn extends_ignores_content_outside_blocks() {
    let loader = loader(&[
        ("base.html", BASE),
        (
            "child.html",
            "{% extends 'base.html' %}ignored{{ nope }}{% block body %}x{% endblock %}ignored",
        ),
    ]);
    assert_eq!(render(&loader, "child.html", value! {}), "<h1>x</h1>");
}

#[test]
fn extends_block_without_placeholder_is_ignored() {
    let loader = loader(&[
        ("base.html", BASE),
        (
            "child.html",
            "{% extends 'base.html' %}{% block sidebar %}x{% endblock %}",
        ),
    ]);
    assert_eq!(render(&loader, "child.html", value! {}), "<h1>default</h1>");
}

#[test]
fn extends_override_uses_context() {
    let loader = loader(&[
        ("base.html", BASE),
        (
            "child.html",
            "{% extends 'base.html' %}{% block body %}Hello {{ name }}!{% endblock %}",
        ),
    ]);
    assert_eq!(
        render(&loader, "child.html", value! { name: "World" }),
        "<h1>Hello World!</h1>"
    );
}

#[test]
fn extends_override_nested_block() {
    let base = "{% block outer %}[{% block inner %}i{% endblock %}]{% endblock %}";
    let loader = loader(&[
        ("base.html", base),
        (
            "inner.html",
            "{% extends 'base.html' %}{% block inner %}I{% endblock %}",
        ),
        (
            "outer.html",
            "{% extends 'base.html' %}{% block outer %}<{% block inner %}y{% endblock %}>{% endblock %}",
        ),
    ]);
    assert_eq!(render(&loader, "inner.html", value! {}), "[I]");
    assert_eq!(render(&loader, "outer.html", value! {}), "<y>");
}

#[test]
fn extends_block_inside_loop() {
    let loader = loader(&[
        (
            "base.html",
            "{% for x in xs %}{% block item %}{{ x }}{% endblock %}{% endfor %}",
        ),
        (
            "child.html",
            "{% extends 'base.html' %}{% block item %}<{{ x }}>{% endblock %}",
        ),
    ]);
    assert_eq!(
        render(&loader, "child.html", value! { xs: [1, 2] }),
        "<1><2>"
    );
}

#[test]
fn extends_grandchild() {
    let loader = loader(&[
        (
            "base.html",
            "{% block a %}A{% endblock %}-{% block b %}B{% endblock %}",
        ),
        (
            "child.html",
            "{% extends 'base.html' %}{% block a %}a{% block c %}C{% endblock %}{% endblock %}",
        ),
        (
            "grandchild.html",
            "{% extends 'child.html' %}{% block b %}b{% endblock %}{% block c %}c{% endblock %}",
        ),
    ]);
    assert_eq!(render(&loader, "child.html", value! {}), "aC-B");
    assert_eq!(render(&loader, "grandchild.html", value! {}), "ac-b");
}

#[test]
fn extends_parent_accessor() {
    let loader = loader(&[
        ("base.html", BASE),
        ("child.html", "{% extends 'base.html' %}"),
    ]);
    let child = loader.load("child.html").unwrap();
    assert_eq!(child.name(), Some("child.html"));
    assert_eq!(child.parent().and_then(|p| p.name()), Some("base.html"));
    assert!(loader.load("base.html").unwrap().parent().is_none());
}

#[test]
fn extends_render_error_points_at_parent() {
    let loader = loader(&[
        ("base.html", "{% block body %}{{ missing }}{% endblock %}"),
        ("child.html", "{% extends 'base.html' %}"),
    ]);
    let err = loader
        .load("child.html")
        .unwrap()
        .render_from(&value! {})
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Render);
    assert_eq!(err.template_name(), Some("base.html"));
    assert_eq!(
        format!("{err:#}"),
        r#"
  --> base.html:1:20
   |
 1 | {% block body %}{{ missing }}{% endblock %}
   |                    ^^^^^^^ `missing` is not defined
"#
    );
}

#[test]
fn extends_missing_parent() {
    let loader = loader(&[("child.html", "{% extends 'missing.html' %}")]);
    let err = loader.load("child.html").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.message(), "template `missing.html` does not exist");
}

#[test]
fn extends_itself() {
    let loader = loader(&[("a.html", "{% extends 'a.html' %}")]);
    let err = loader.load("a.html").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Syntax);
    assert_eq!(err.template_name(), Some("a.html"));
    assert_eq!(
        err.message(),
        "template `a.html` is recursively extended or included"
    );
    assert!(loader.is_empty());
}

#[test]
fn extends_cycle() {
    let loader = loader(&[
        ("a.html", "{% extends 'b.html' %}"),
        ("b.html", "{% extends 'a.html' %}"),
    ]);
    let err = loader.load("a.html").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Syntax);
    assert_eq!(err.template_name(), Some("b.html"));
    assert_eq!(
        err.message(),
        "template `a.html` is recursively extended or included"
    );
}

#[test]
fn include_shares_context() {
    let loader = loader(&[
        ("nav.html", "<nav>{{ title }}</nav>"),
        ("page.html", "{% include 'nav.html' %}<p>{{ title }}</p>"),
    ]);
    assert_eq!(
        render(&loader, "page.html", value! { title: "Hi" }),
        "<nav>Hi</nav><p>Hi</p>"
    );
}

#[test]
fn include_sees_loop_variables() {
    let loader = loader(&[
        ("item.html", "<li>{{ item }}</li>"),
        (
            "list.html",
            "{% for item in items %}{% include 'item.html' %}{% endfor %}",
        ),
    ]);
    assert_eq!(
        render(&loader, "list.html", value! { items: ["a", "b"] }),
        "<li>a</li><li>b</li>"
    );
}

#[test]
fn include_inside_block() {
    let loader = loader(&[
        ("base.html", BASE),
        ("nav.html", "<nav>{{ title }}</nav>"),
        (
            "child.html",
            "{% extends 'base.html' %}{% block body %}{% include 'nav.html' %}{% endblock %}",
        ),
    ]);
    assert_eq!(
        render(&loader, "child.html", value! { title: "T" }),
        "<h1><nav>T</nav></h1>"
    );
}

#[test]
fn include_is_cached() {
    let loader = loader(&[
        ("nav.html", "nav"),
        ("page.html", "{% include 'nav.html' %}"),
    ]);
    loader.load("page.html").unwrap();
    assert_eq!(loader.len(), 2);
}

#[test]
fn include_missing() {
    let loader = loader(&[("page.html", "{% include 'nope.html' %}")]);
    let err = loader.load("page.html").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.message(), "template `nope.html` does not exist");
}

#[test]
fn include_cycle() {
    let loader = loader(&[
        ("a.html", "{% include 'b.html' %}"),
        ("b.html", "{% include 'a.html' %}"),
    ]);
    let err = loader.load("a.html").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Syntax);
    assert_eq!(
        err.message(),
        "template `a.html` is recursively extended or included"
    );
}

#[test]
fn compile_from_source_can_extend() {
    let loader = loader(&[("base.html", BASE)]);
    let template = loader
        .compile("{% extends 'base.html' %}{% block body %}source{% endblock %}")
        .unwrap();
    assert_eq!(template.name(), None);
    assert_eq!(template.render_from(&value! {}).unwrap(), "<h1>source</h1>");
}
