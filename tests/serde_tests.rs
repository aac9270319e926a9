#[cfg(feature = "serde")]
mod serde_tests {
    use unilate::{Context, EngineConfig, UnifiedEngine, Value, ValueTy};

    #[test]
    fn test_value_ty_serialization() {
        let ty = ValueTy::String;
        let serialized = serde_json::to_string(&ty).unwrap();
        assert_eq!(serialized, r#""String""#);

        let deserialized: ValueTy = serde_json::from_str(&serialized).unwrap();
        assert_eq!(deserialized, ty);
    }

    #[test]
    fn test_value_serialization() {
        let value: Value = [
            ("name", Value::from("John")),
            ("age", Value::from(42)),
            ("tags", Value::from(vec!["a", "b"])),
            ("missing", Value::Null),
        ]
        .into_iter()
        .collect();

        let serialized = serde_json::to_string(&value).unwrap();
        assert_eq!(
            serialized,
            r#"{"age":42,"missing":null,"name":"John","tags":["a","b"]}"#
        );

        let deserialized: Value = serde_json::from_str(&serialized).unwrap();
        assert_eq!(deserialized, value);
    }

    #[test]
    fn test_context_serialization() {
        let mut context = Context::new();
        context
            .insert("name", "John")
            .insert("active", true)
            .insert("ratio", 0.25);

        let serialized = serde_json::to_string(&context).unwrap();
        let deserialized: Context = serde_json::from_str(&serialized).unwrap();

        assert_eq!(deserialized, context);
        assert_eq!(deserialized.get("name"), Some(&Value::from("John")));
        assert_eq!(deserialized.get("active"), Some(&Value::Bool(true)));
        assert_eq!(deserialized.get("ratio"), Some(&Value::Float(0.25)));
    }

    #[test]
    fn test_context_from_json_drives_template() {
        let context: Context =
            serde_json::from_str(r#"{"data":{"user":{"name":"Ann"},"count":2}}"#).unwrap();

        let engine = UnifiedEngine::new();
        let template = engine.parse("${user.name} x${count + 1}").unwrap();
        assert_eq!(
            template.evaluate(Some(&context)).unwrap(),
            Value::from("Ann x3")
        );
    }

    #[test]
    fn test_config_serialization() {
        let config = EngineConfig::new().lenient(true).with_cache_capacity(8);
        let serialized = serde_json::to_string(&config).unwrap();
        let deserialized: EngineConfig = serde_json::from_str(&serialized).unwrap();
        assert_eq!(deserialized, config);

        // Missing fields fall back to the defaults.
        let partial: EngineConfig = serde_json::from_str(r#"{"silent":true}"#).unwrap();
        assert_eq!(partial, EngineConfig::new().silent(true));
    }

    #[test]
    fn test_template_serializes_as_source() {
        let engine = UnifiedEngine::new();
        let template = engine.parse("Dear #{p} ${name};").unwrap();

        let serialized = serde_json::to_string(&template).unwrap();
        assert_eq!(serialized, r#""Dear #{p} ${name};""#);

        // The source can be parsed again to get an equal template.
        let source: String = serde_json::from_str(&serialized).unwrap();
        assert_eq!(engine.parse(source).unwrap(), template);
    }
}
