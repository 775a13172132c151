use forge_parser::parse_program;
use forge_runtime::{ExecutionLimits, Interpreter, RuntimeError, RuntimeSideEffect, Value};
use pretty_assertions::assert_eq;

fn console_lines(interp: &mut Interpreter) -> Vec<String> {
    interp
        .take_side_effects()
        .into_iter()
        .filter_map(|effect| match effect {
            RuntimeSideEffect::Console { message, .. } => Some(message),
            _ => None,
        })
        .collect()
}

fn run(source: &str) -> Vec<String> {
    let program = parse_program(source).expect("Failed to parse program");
    let mut interp = Interpreter::new();
    interp.run_module(&program).expect("Runtime error");
    console_lines(&mut interp)
}

fn run_err(source: &str) -> RuntimeError {
    let program = parse_program(source).expect("Failed to parse program");
    let mut interp = Interpreter::new();
    match interp.run_module(&program) {
        Ok(_) => panic!("expected the program to fail"),
        Err(err) => err,
    }
}

#[test]
fn test_closures_capture_their_scope() {
    let out = run(r#"
        function makeCounter() {
            let count = 0;
            return () => { count += 1; return count; };
        }
        const next = makeCounter();
        next();
        next();
        console.log(next());
    "#);
    assert_eq!(out, vec!["3"]);
}

#[test]
fn test_let_is_fresh_per_iteration() {
    let out = run(r#"
        const fns = [];
        for (let i = 0; i < 3; i++) {
            fns.push(() => i);
        }
        console.log(fns.map(f => f()).join(","));
    "#);
    assert_eq!(out, vec!["0,1,2"]);
}

#[test]
fn test_destructuring_patterns() {
    let out = run(r#"
        const { name, tags: [first, ...rest], missing = "fallback" } = {
            name: "forge",
            tags: ["a", "b", "c"],
        };
        console.log(name, first, rest.length, missing);
    "#);
    assert_eq!(out, vec!["forge a 2 fallback"]);
}

#[test]
fn test_try_catch_finally() {
    let out = run(r#"
        function risky(flag) {
            try {
                if (flag) throw new Error("boom");
                return "ok";
            } catch (e) {
                return "caught " + e.message;
            } finally {
                console.log("finally");
            }
        }
        console.log(risky(false));
        console.log(risky(true));
    "#);
    assert_eq!(out, vec!["finally", "ok", "finally", "caught boom"]);
}

#[test]
fn test_type_errors_are_catchable() {
    let out = run(r#"
        try {
            const user = undefined;
            user.name;
        } catch (err) {
            console.log(err.name);
        }
    "#);
    assert_eq!(out, vec!["TypeError"]);
}

#[test]
fn test_optional_chaining_and_nullish() {
    let out = run(r#"
        const config = { theme: { color: "blue" } };
        console.log(config.theme?.color, config.layout?.width ?? "auto");
        console.log(config.missing?.());
    "#);
    assert_eq!(out, vec!["blue auto", "undefined"]);
}

#[test]
fn test_array_methods() {
    let out = run(r#"
        const items = [5, 3, 8, 1];
        const doubled = items.map(n => n * 2);
        const total = items.reduce((sum, n) => sum + n, 0);
        const sorted = [...items].sort((a, b) => a - b);
        console.log(doubled.join(" "));
        console.log(total, items.filter(n => n > 2).length, items.find(n => n > 4));
        console.log(sorted.join(","), items.includes(8), items.indexOf(1));
    "#);
    assert_eq!(out, vec!["10 6 16 2", "17 3 5", "1,3,5,8 true 3"]);
}

#[test]
fn test_template_literals_and_string_methods() {
    let out = run(r#"
        const name = "  Ada  ";
        console.log(`Hello, ${name.trim().toUpperCase()}!`);
        console.log("a-b-c".split("-").length, "abc".padStart(5, "*"));
    "#);
    assert_eq!(out, vec!["Hello, ADA!", "3 **abc"]);
}

#[test]
fn test_json_stringify() {
    let out = run(r#"
        const data = { id: 1, label: "x", skip: undefined, list: [1, 2] };
        console.log(JSON.stringify(data));
    "#);
    assert_eq!(out, vec![r#"{"id":1,"label":"x","list":[1,2]}"#]);
}

#[test]
fn test_switch_falls_through() {
    let out = run(r#"
        function grade(n) {
            let out = "";
            switch (n) {
                case 1:
                    out += "one ";
                case 2:
                    out += "two";
                    break;
                default:
                    out = "other";
            }
            return out;
        }
        console.log(grade(1));
        console.log(grade(3));
    "#);
    assert_eq!(out, vec!["one two", "other"]);
}

#[test]
fn test_undefined_variable_is_reference_error() {
    let err = run_err("console.log(missingValue);");
    assert!(matches!(err, RuntimeError::UndefinedVariable(ref name) if name == "missingValue"));
}

#[test]
fn test_const_reassignment_fails() {
    let err = run_err("const x = 1; x = 2;");
    assert!(matches!(err, RuntimeError::ConstAssignment(_)));
}

#[test]
fn test_uncaught_throw_keeps_the_value() {
    let err = run_err(r#"throw new Error("top level");"#);
    assert_eq!(err.message(), "top level");
}

#[test]
fn test_step_limit_stops_infinite_loops() {
    let program = parse_program("while (true) {}").expect("Failed to parse program");
    let mut interp = Interpreter::with_limits(ExecutionLimits {
        max_steps: 10_000,
        ..ExecutionLimits::default()
    });
    let err = interp.run_module(&program).unwrap_err();
    assert!(matches!(err, RuntimeError::StepLimitExceeded(10_000)));
    assert!(!err.is_catchable());
}

#[test]
fn test_call_depth_limit() {
    // The tree walker recurses on the native stack, so give it room.
    let handle = std::thread::Builder::new()
        .stack_size(16 * 1024 * 1024)
        .spawn(|| {
            let program = parse_program("function down(n) { return down(n + 1); } down(0);")
                .expect("Failed to parse program");
            let mut interp = Interpreter::new();
            let err = interp.run_module(&program).unwrap_err();
            assert!(matches!(err, RuntimeError::CallDepthExceeded(_)));
        })
        .unwrap();
    handle.join().unwrap();
}

#[test]
fn test_module_scope_holds_declarations() {
    let program = parse_program("function App() { return null; } const helper = 1;")
        .expect("Failed to parse program");
    let mut interp = Interpreter::new();
    let module = interp.run_module(&program).unwrap();
    assert!(module.get_local("App").is_some_and(|v| v.is_callable()));
    assert_eq!(module.get_local("helper"), Some(Value::Number(1.0)));
    assert!(interp.globals().get_local("App").is_none());
}

#[test]
fn test_timers_are_recorded_not_run() {
    let program = parse_program(r#"
        const id = setTimeout(() => console.log("never"), 100);
        clearTimeout(id);
    "#)
    .unwrap();
    let mut interp = Interpreter::new();
    interp.run_module(&program).unwrap();
    let effects = interp.take_side_effects();
    assert!(matches!(
        effects.as_slice(),
        [
            RuntimeSideEffect::TimerScheduled { id: 1, repeating: false, .. },
            RuntimeSideEffect::TimerCleared(1)
        ]
    ));
}

#[test]
fn test_map_sees_mutations_made_by_the_callback() {
    let out = run(r#"
        const a = [1, 2, 3];
        console.log(a.map(() => a.pop()).join(","));
        const b = [1, 2, 3];
        const seen = [];
        b.forEach((x) => { seen.push(x); b.shift(); });
        console.log(seen.join(","));
    "#);
    assert_eq!(out, vec!["3,2,", "1,3"]);
}

#[test]
fn test_self_containing_array_stringifies() {
    let out = run(r#"
        const a = [1, 2];
        a.push(a);
        console.log(a.join("-"));
        console.log(String(a));
        console.log(`${[a, [a]]}`);
    "#);
    assert_eq!(out, vec!["1-2-", "1,2,", "1,2,,1,2,"]);
}

#[test]
fn test_oversized_collections_throw_range_errors() {
    let out = run(r#"
        for (const make of [
            () => new Array(4294967295),
            () => Array(-1),
            () => Array.from({ length: 1e12 }),
            () => "ab".repeat(1e13),
            () => "x".padStart(1e12),
        ]) {
            try {
                make();
                console.log("allocated");
            } catch (e) {
                console.log(e.name, e.message);
            }
        }
    "#);
    assert_eq!(
        out,
        vec![
            "RangeError Invalid array length",
            "RangeError Invalid array length",
            "RangeError Invalid array length",
            "RangeError Invalid string length",
            "RangeError Invalid string length",
        ]
    );
}

#[test]
fn test_doubling_stops_at_the_size_limit() {
    let program = parse_program(r#"
        let s = "x";
        while (true) { s += s; }
    "#)
    .expect("Failed to parse program");
    let mut interp = Interpreter::with_limits(ExecutionLimits {
        max_string_len: 1 << 16,
        ..ExecutionLimits::default()
    });
    let err = interp.run_module(&program).unwrap_err();
    assert_eq!(err.message(), "RangeError: Invalid string length");

    let err = run_err("let a = [1]; while (true) { a = [...a, ...a]; }");
    assert_eq!(err.message(), "RangeError: Invalid array length");
}

#[test]
fn test_bitwise_operators() {
    let out = run(r#"
        console.log(6 & 3, 6 | 3, 6 ^ 3, ~5, 1 << 4, -16 >> 2, -1 >>> 28, 2 ** 32 | 0);
    "#);
    assert_eq!(out, vec!["2 7 5 -6 16 -4 15 0"]);
}

#[test]
fn test_regex_literals() {
    let out = run(r#"
        const email = /^[^\s@]+@[^\s@]+\.[^\s@]+$/;
        console.log(email.test("a@b.co"), email.test("nope"));
        console.log("2024-01-05".replace(/(\d+)-(\d+)-(\d+)/, "$3/$2/$1"));
        console.log("a1b22".match(/\d+/g).join("|"), /x/gi.flags, String(/a\/b/));
        console.log("Hello World".replace(/o/g, (m) => m.toUpperCase()));
        console.log(new RegExp("^h", "i").test("Hi"), /a/ instanceof RegExp);
        try { new RegExp("(?=a)"); } catch (e) { console.log(e.name); }
    "#);
    assert_eq!(
        out,
        vec![
            "true false",
            "05/01/2024",
            "1|22 gi /a\\/b/",
            "HellO WOrld",
            "true true",
            "SyntaxError",
        ]
    );
}
