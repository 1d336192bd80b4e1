use flango::{value, ErrorKind, Loader, Template, Value};

#[track_caller]
fn render(source: &str, ctx: Value) -> String {
    Loader::builder(".")
        .autoescape(false)
        .build()
        .compile(source)
        .unwrap()
        .render_from(&ctx)
        .unwrap()
}

#[track_caller]
fn render_err(source: &str, ctx: Value) -> flango::Error {
    Loader::builder(".")
        .autoescape(false)
        .build()
        .compile(source)
        .unwrap()
        .render_from(&ctx)
        .unwrap_err()
}

#[test]
fn render_empty() {
    assert_eq!(render("", value! {}), "");
}

#[test]
fn render_plain_text() {
    let result = render("lorem ipsum dolor sit amet", value! {});
    assert_eq!(result, "lorem ipsum dolor sit amet");
}

#[test]
fn render_inline_expr() {
    let result = Template::new("Hello, {{ name }}")
        .unwrap()
        .render(value! { name: "flango" })
        .unwrap();
    assert_eq!(result, "Hello, flango");
}

#[test]
fn render_inline_expr_scalars() {
    let result = render(
        "{{ n }} {{ yes }} {{ no }} {{ f }} {{ g }} {{ none }}",
        value! { n: 42, yes: true, no: false, f: 2.0, g: 0.5, none: None },
    );
    assert_eq!(result, "42 True False 2.0 0.5 None");
}

#[test]
fn render_inline_expr_collections() {
    let result = render(
        "{{ list }} {{ map }}",
        value! { list: [1, "a", None], map: { a: 1, b: "it's" } },
    );
    assert_eq!(result, r#"[1, 'a', None] {'a': 1, 'b': "it's"}"#);
}

#[test]
fn render_unclosed_marker_is_text() {
    let result = render("a {{ b", value! {});
    assert_eq!(result, "a {{ b");
}

#[test]
fn render_if_else_in_for() {
    let result = render(
        "{% for i in l %}{% if i > 3 %}{{ i }}{% else %}less than 3\n{% endif %}{% endfor %}",
        value! { l: [2, 4] },
    );
    assert_eq!(result, "less than 3\n4");
}

#[test]
fn render_if_elif_else() {
    let source = "{% if n < 0 %}negative{% elif n == 0 %}zero{% else %}positive{% endif %}";
    assert_eq!(render(source, value! { n: -3 }), "negative");
    assert_eq!(render(source, value! { n: 0 }), "zero");
    assert_eq!(render(source, value! { n: 7 }), "positive");
}

#[test]
fn render_if_truthiness() {
    let source = "{% if x %}yes{% else %}no{% endif %}";
    assert_eq!(render(source, value! { x: "" }), "no");
    assert_eq!(render(source, value! { x: [] }), "no");
    assert_eq!(render(source, value! { x: {} }), "no");
    assert_eq!(render(source, value! { x: 0.0 }), "no");
    assert_eq!(render(source, value! { x: None }), "no");
    assert_eq!(render(source, value! { x: "a" }), "yes");
    assert_eq!(render(source, value! { x: [0] }), "yes");
}

#[test]
fn render_for_unpack() {
    let result = render(
        "{% for k, v in m.items() %}{{ k }}={{ v }};{% endfor %}",
        value! { m: { a: 1, b: 2 } },
    );
    assert_eq!(result, "a=1;b=2;");
}

#[test]
fn render_for_string_and_map() {
    let result = render(
        "{% for c in s %}[{{ c }}]{% endfor %} {% for k in m %}{{ k }}{% endfor %}",
        value! { s: "abc", m: { x: 1, y: 2 } },
    );
    assert_eq!(result, "[a][b][c] xy");
}

#[test]
fn render_for_enumerate() {
    let result = render(
        "{% for i, x in enumerate(xs, 1) %}{{ i }}{{ x }} {% endfor %}",
        value! { xs: ["a", "b"] },
    );
    assert_eq!(result, "1a 2b ");
}

#[test]
fn render_for_else() {
    let source = "{% for x in xs %}{{ x }}{% else %}!{% endfor %}";
    assert_eq!(render(source, value! { xs: [] }), "!");
    assert_eq!(render(source, value! { xs: [1, 2] }), "12!");
}

#[test]
fn render_for_loop_var_shadows_context() {
    let result = render(
        "{% for x in [1, 2] %}{{ x }}{% endfor %}{{ x }}",
        value! { x: 5 },
    );
    assert_eq!(result, "125");
}

#[test]
fn render_for_loop_var_out_of_scope() {
    let err = render_err("{% for x in [1] %}{% endfor %}{{ x }}", value! {});
    assert_eq!(err.kind(), ErrorKind::Render);
    assert_eq!(err.message(), "`x` is not defined");
}

#[test]
fn render_for_nested() {
    let result = render(
        "{% for row in rows %}{% for x in row %}{{ x }}{% endfor %};{% endfor %}",
        value! { rows: [[1, 2], [3]] },
    );
    assert_eq!(result, "12;3;");
}

#[test]
fn render_for_not_iterable() {
    let err = render_err("{% for x in n %}{% endfor %}", value! { n: 1 });
    assert_eq!(
        format!("{err:#}"),
        "
   |
 1 | {% for x in n %}{% endfor %}
   |             ^ expected iterable, but expression evaluated to integer
"
    );
}

#[test]
fn render_for_unpack_err() {
    let err = render_err(
        "{% for a, b, c in xs %}{% endfor %}",
        value! { xs: [[1, 2]] },
    );
    assert_eq!(err.message(), "cannot unpack list of length 2 into 3 variables");
}

#[test]
fn render_while_else() {
    let result = render("{% while False %}x{% else %}done{% endwhile %}", value! {});
    assert_eq!(result, "done");
}

#[test]
fn render_try_except() {
    let result = render(
        "{% try %}a{{ missing }}{% except %}fallback{% endtry %}",
        value! {},
    );
    assert_eq!(result, "fallback");
}

#[test]
fn render_try_no_error() {
    let result = render(
        "{% try %}ok{% except %}fallback{% finally %}!{% endtry %}",
        value! {},
    );
    assert_eq!(result, "ok!");
}

#[test]
fn render_try_finally_propagates() {
    let err = render_err("{% try %}{{ 1 // 0 }}{% finally %}!{% endtry %}", value! {});
    assert_eq!(err.kind(), ErrorKind::Render);
    assert_eq!(err.message(), "integer division by zero");
}

#[test]
fn render_try_except_in_loop() {
    let result = render(
        "{% for x in xs %}{% try %}{{ 10 // x }}{% except %}-{% endtry %} {% endfor %}",
        value! { xs: [2, 0, 5] },
    );
    assert_eq!(result, "5 - 2 ");
}

#[test]
fn render_whitespace_collapse() {
    let result = render("a\n\n\n  b\n   \n\tc", value! {});
    assert_eq!(result, "a\n  b\n\tc");
}

#[test]
fn render_whitespace_collapse_between_statements() {
    let result = render(
        "<ul>\n{% for x in xs %}\n  <li>{{ x }}</li>\n{% endfor %}\n</ul>",
        value! { xs: [1, 2] },
    );
    assert_eq!(result, "<ul>\n  <li>1</li>\n  <li>2</li>\n</ul>");
}

#[test]
fn render_autoescape() {
    let result = Loader::builder(".")
        .autoescape(true)
        .build()
        .compile("{{ s }}")
        .unwrap()
        .render_from(&value! { s: r#"<b>&"'"# })
        .unwrap();
    assert_eq!(result, "&lt;b&gt;&amp;&quot;&#039;");
}

#[test]
fn render_autoescape_off_by_default() {
    let template = Template::new("{{ s }} {{ m }}").unwrap();
    assert!(!template.autoescape());
    let result = template
        .render_from(&value! { s: "<b>", m: { a: 1 } })
        .unwrap();
    assert_eq!(result, "<b> {'a': 1}");

    let result = Loader::new(".")
        .compile("{{ s }} {{ m }}")
        .unwrap()
        .render_from(&value! { s: "<b>", m: { a: 1 } })
        .unwrap();
    assert_eq!(result, "<b> {'a': 1}");
}

#[test]
fn render_escape_function() {
    let result = render("{{ escape(s) }}", value! { s: "<a href='x'>" });
    assert_eq!(result, "&lt;a href=&#039;x&#039;&gt;");
}

#[test]
fn render_arithmetic() {
    let result = render(
        "{{ 7 // 2 }} {{ -7 // 2 }} {{ 7 % -3 }} {{ 7 / 2 }} {{ 2 ** 10 }} {{ 2 ** -1 }} {{ 1 + 2 * 3 }} {{ (1 + 2) * 3 }}",
        value! {},
    );
    assert_eq!(result, "3 -4 -2 3.5 1024 0.5 7 9");
}

#[test]
fn render_arithmetic_mixed() {
    let result = render("{{ 1 + 0.5 }} {{ True + 1 }} {{ 4 / 2 }} {{ -x }}", value! { x: 3 });
    assert_eq!(result, "1.5 2 2.0 -3");
}

#[test]
fn render_string_and_list_operators() {
    let result = render(
        "{{ 'ab' * 3 }} {{ 'a' + 'b' }} {{ [1] + [2] }} {{ [0] * 2 }}",
        value! {},
    );
    assert_eq!(result, "ababab ab [1, 2] [0, 0]");
}

#[test]
fn render_comparisons() {
    let result = render(
        "{{ 1 < 2 < 3 }} {{ 1 < 3 < 2 }} {{ 1 == 1.0 }} {{ 'a' != 'b' }} {{ [1, 2] < [1, 3] }}",
        value! {},
    );
    assert_eq!(result, "True False True True True");
}

#[test]
fn render_membership_and_identity() {
    let result = render(
        "{{ 2 in [1, 2] }} {{ 'x' not in 'abc' }} {{ 'a' in m }} {{ n is None }} {{ n is not None }}",
        value! { m: { a: 1 }, n: None },
    );
    assert_eq!(result, "True True True True False");
}

#[test]
fn render_logical_operators() {
    let result = render(
        "{{ 0 or 'x' }} {{ 1 and 2 }} {{ None or 0 }} {{ not [] }}",
        value! {},
    );
    assert_eq!(result, "x 2 0 True");
}

#[test]
fn render_logical_short_circuit() {
    let result = render("{{ x or missing }} {{ not x and missing }}", value! { x: 1 });
    assert_eq!(result, "1 False");
}

#[test]
fn render_conditional_expr() {
    let source = "{{ 'many' if n > 1 else 'one' }}";
    assert_eq!(render(source, value! { n: 3 }), "many");
    assert_eq!(render(source, value! { n: 1 }), "one");
}

#[test]
fn render_index_and_slice() {
    let result = render(
        "{{ l[0] }} {{ l[-1] }} {{ l[1:] }} {{ l[:-1] }} {{ s[1:3] }} {{ s[-1] }} {{ m['k'] }}",
        value! { l: [1, 2, 3], s: "hello", m: { k: "v" } },
    );
    assert_eq!(result, "1 3 [2, 3] [1, 2] el o v");
}

#[test]
fn render_index_out_of_range() {
    let err = render_err("{{ l[3] }}", value! { l: [1, 2, 3] });
    assert_eq!(
        format!("{err:#}"),
        "
   |
 1 | {{ l[3] }}
   |      ^ list index out of range
"
    );
}

#[test]
fn render_attribute_nested() {
    let result = render(
        "{{ user.name.first }} {{ user['name'].last }}",
        value! { user: { name: { first: "John", last: "Smith" } } },
    );
    assert_eq!(result, "John Smith");
}

#[test]
fn render_attribute_missing_key() {
    let err = render_err("{{ user.age }}", value! { user: { name: "John" } });
    assert_eq!(
        format!("{err:#}"),
        "
   |
 1 | {{ user.age }}
   |         ^^^ key `age` not found in map
"
    );
}

#[test]
fn render_attribute_not_a_map() {
    let err = render_err("{{ n.x }}", value! { n: 1 });
    assert_eq!(err.message(), "cannot access attribute `x` of integer");
}

#[test]
fn render_list_and_map_literals() {
    let result = render(
        "{{ [1, (2, 3)] }} {% for k, v in {'a': 1}.items() %}{{ k }}{{ v }}{% endfor %}",
        value! {},
    );
    assert_eq!(result, "[1, [2, 3]] a1");
}

#[test]
fn render_builtins() {
    let result = render(
        "{{ abs(-3) }} {{ len([1, 2, 3]) }} {{ [1, 2, 3].index(2) }} {{ list(map(lambda x: x * 2, [1, 2, 3])) }}",
        value! {},
    );
    assert_eq!(result, "3 3 1 [2, 4, 6]");
}

#[test]
fn render_builtins_conversions() {
    let result = render(
        "{{ int('42') + 1 }} {{ int(3.9) }} {{ float(2) }} {{ str(1.5) + '!' }} {{ bool('') }} {{ list('ab') }}",
        value! {},
    );
    assert_eq!(result, "43 3 2.0 1.5! False ['a', 'b']");
}

#[test]
fn render_builtins_sequences() {
    let result = render(
        "{{ range(3) }} {{ range(1, 7, 2) }} {{ sum([1, 2, 3]) }} {{ min(4, 2, 8) }} {{ max([4, 2, 8]) }} {{ list(reversed([1, 2])) }} {{ list(zip([1, 2], 'ab')) }}",
        value! {},
    );
    assert_eq!(
        result,
        "[0, 1, 2] [1, 3, 5] 6 2 8 [2, 1] [[1, 'a'], [2, 'b']]"
    );
}

#[test]
fn render_builtins_higher_order() {
    let result = render(
        "{{ sorted(names, lambda n: n.lower()) }} {{ list(filter(lambda x: x % 2, range(6))) }} {{ list(map(str, [1, 2])) }} {{ sorted([3, 1, 2]) }}",
        value! { names: ["bob", "Alice", "carol"] },
    );
    assert_eq!(
        result,
        "['Alice', 'bob', 'carol'] [1, 3, 5] ['1', '2'] [1, 2, 3]"
    );
}

#[test]
fn render_builtins_round_any_all() {
    let result = render(
        "{{ round(2.5) }} {{ round(3.5) }} {{ round(3.14159, 2) }} {{ any([0, 1]) }} {{ all([0, 1]) }}",
        value! {},
    );
    assert_eq!(result, "2 4 3.14 True False");
}

#[test]
fn render_lambda_captures_loop_var() {
    let result = render(
        "{% for n in [1, 2] %}{{ list(map(lambda x: x + n, [10, 20])) }}{% endfor %}",
        value! {},
    );
    assert_eq!(result, "[11, 21][12, 22]");
}

#[test]
fn render_methods() {
    let result = render(
        "{{ s.upper() }} {{ s.split(',') }} {{ '-'.join(['a', 'b']) }} {{ s.replace(',', ' ') }} {{ m.get('x', 0) }} {{ m.keys() }}",
        value! { s: "a,b", m: { k: 1 } },
    );
    assert_eq!(result, "A,B ['a', 'b'] a-b a b 0 ['k']");
}

#[test]
fn render_function_not_callable_as_value() {
    let err = render_err("{{ len }}", value! {});
    assert_eq!(err.message(), "function `len` can only be called");
}

#[test]
fn render_call_context_value() {
    let err = render_err("{{ x() }}", value! { x: 1 });
    assert_eq!(err.message(), "integer is not callable");
}

#[test]
fn render_call_undefined() {
    let err = render_err("{{ nope(1) }}", value! {});
    assert_eq!(err.message(), "`nope` is not defined");
}

#[test]
fn render_builtin_arity() {
    let err = render_err("{{ len() }}", value! {});
    assert_eq!(
        format!("{err:#}"),
        "
   |
 1 | {{ len() }}
   |    ^^^^^ len() expected 1 arguments, found 0
"
    );
}

#[test]
fn render_type_error() {
    let err = render_err("{{ x - 'a' }}", value! { x: 1 });
    assert_eq!(
        err.message(),
        "unsupported operand types for `-`: integer and string"
    );
}

#[test]
fn render_integer_overflow() {
    let err = render_err("{{ x * 2 }}", value! { x: i64::MAX });
    assert_eq!(err.message(), "integer overflow");
}

#[test]
fn render_repetition_too_large() {
    for source in [
        "{{ 'a' * 10 ** 18 }}",
        "{{ [1, 2] * 10 ** 18 }}",
        "{{ 10 ** 18 * 'a' }}",
    ] {
        let err = render_err(source, value! {});
        assert_eq!(err.kind(), ErrorKind::Render);
        assert_eq!(err.message(), "repetition too large");
    }
    assert_eq!(render("{{ [] * 10 ** 18 }}", value! {}), "[]");
    assert_eq!(render("{{ 'ab' * 2 }}", value! {}), "abab");
}

#[test]
fn render_range_too_large() {
    let err = render_err("{{ range(10 ** 18) }}", value! {});
    assert_eq!(err.kind(), ErrorKind::Render);
    assert_eq!(err.message(), "range() result too large");

    let err = render_err("{{ range(10 ** 18, 0, -1) }}", value! {});
    assert_eq!(err.message(), "range() result too large");

    assert_eq!(
        render("{{ range(10 ** 18, 10 ** 18 + 2) }}", value! {}),
        "[1000000000000000000, 1000000000000000001]"
    );
    assert_eq!(
        render("{{ range(5, 0, -2) }} {{ range(0, 10, 3) }}", value! {}),
        "[5, 3, 1] [0, 3, 6, 9]"
    );
}

#[test]
fn render_division_by_zero() {
    assert_eq!(
        render_err("{{ 1 / 0 }}", value! {}).message(),
        "division by zero"
    );
    assert_eq!(
        render_err("{{ 1 % 0 }}", value! {}).message(),
        "integer modulo by zero"
    );
}

#[test]
fn render_undefined_keeps_template_usable() {
    let template = Template::new("Hello {{ name }}").unwrap();
    let err = template.render(value! {}).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Render);
    assert_eq!(
        format!("{err:#}"),
        "
   |
 1 | Hello {{ name }}
   |          ^^^^ `name` is not defined
"
    );
    let result = template.render(value! { name: "John" }).unwrap();
    assert_eq!(result, "Hello John");
}

#[test]
fn render_context_must_be_map() {
    let template = Template::new("{{ x }}").unwrap();
    let err = template.render_from(&Value::from(vec![1, 2])).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Render);
    assert_eq!(err.to_string(), "render context must be a map, found list");
}

#[test]
fn render_context_none() {
    let result = Template::new("plain").unwrap().render_from(&Value::None).unwrap();
    assert_eq!(result, "plain");
}

#[cfg(feature = "serde")]
#[test]
fn render_struct_context() {
    #[derive(serde::Serialize)]
    struct Outer {
        o: Inner,
    }

    #[derive(serde::Serialize)]
    struct Inner {
        a: &'static str,
        b: Vec<i32>,
    }

    let ctx = Outer {
        o: Inner {
            a: "x",
            b: vec![1, 2, 3],
        },
    };
    let result = Template::new("{{ o.a }}:{% for i in o.b %}{{ i }}{% endfor %}")
        .unwrap()
        .render(&ctx)
        .unwrap();
    assert_eq!(result, "x:123");
}

#[cfg(feature = "serde")]
#[test]
fn render_to_writer() {
    let mut buf = Vec::new();
    Template::new("lorem {{ ipsum }}")
        .unwrap()
        .render_to_writer(&mut buf, value! { ipsum: "dolor" })
        .unwrap();
    assert_eq!(String::from_utf8(buf).unwrap(), "lorem dolor");
}

#[test]
fn render_unicode() {
    let result = render("{{ s.upper() }} {{ len(s) }} {{ s[1] }}", value! { s: "héllo" });
    assert_eq!(result, "HÉLLO 5 é");
}
