#[path = "../common/mod.rs"]
mod common;

#[cfg(test)]
mod tests {
    use super::common::Fixture;
    use eds::config::Settings;
    use eds::{EdsError, EntityItem, ReadOptions, Value};

    fn names(items: &[EntityItem]) -> Vec<String> {
        items
            .iter()
            .map(|item| item.value("Name").unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_read_all() {
        let fixture = Fixture::new(false);
        let eds = fixture.open();

        let items = eds
            .read("Compound", &ReadOptions::new().order("ID"))
            .unwrap()
            .to_vec()
            .unwrap();
        assert_eq!(
            names(&items),
            vec!["Caffeine", "Theobromine", "Paraxanthine", "Adenine"]
        );

        let caffeine = &items[0];
        assert_eq!(caffeine.to_string(), "Compound(1)");
        assert_eq!(caffeine.ids(), &[Value::Int(1)]);
        assert_eq!(caffeine.value("Calc. MW").unwrap(), &Value::Float(194.19));
        assert_eq!(caffeine.value("Checked").unwrap(), &Value::Bool(false));
        assert_eq!(caffeine.value("Polarity").unwrap().to_string(), "Positive");
        assert!(caffeine.value("Tags").unwrap().is_null());
        // no view store, no view column
        assert!(!caffeine.has_property("Comment"));

        assert!(items[3].value("Polarity").unwrap().is_null());
    }

    #[test]
    fn test_filter_text() {
        let fixture = Fixture::new(false);
        let eds = fixture.open();

        let mut read = eds
            .read(
                "Compound",
                &ReadOptions::new()
                    .filter("\"Calc. MW\" < 190 AND Polarity = 1 OR Name LIKE 'Aden%' ORDER BY ID DESC"),
            )
            .unwrap();
        let items = read.to_vec().unwrap();
        assert_eq!(names(&items), vec!["Adenine", "Theobromine"]);

        let items = eds
            .read("Compound", &ReadOptions::new().filter("Checked = 1"))
            .unwrap()
            .to_vec()
            .unwrap();
        assert_eq!(names(&items), vec!["Theobromine"]);
    }

    #[test]
    fn test_generated_sql() {
        let fixture = Fixture::new(false);
        let eds = fixture.open();

        let read = eds
            .read(
                "Compound",
                &ReadOptions::new().properties(["Name"]).filter("Polarity = 1"),
            )
            .unwrap();
        insta::assert_snapshot!(read.sql(), @r#"SELECT "T1"."ID", "T1"."Name" FROM "Compounds" AS "T1" WHERE "T1"."Polarity" = ?"#);
        assert_eq!(read.params(), &[rusqlite::types::Value::Integer(1)]);
    }

    #[test]
    fn test_properties_and_exclude() {
        let fixture = Fixture::new(false);
        let eds = fixture.open();

        let items = eds
            .read("Compound", &ReadOptions::new().properties(["Calc. MW"]).limit(1))
            .unwrap()
            .to_vec()
            .unwrap();
        let selected: Vec<&str> = items[0].properties().iter().map(|p| p.name()).collect();
        assert_eq!(selected, vec!["ID", "MolecularWeight"]);

        let items = eds
            .read("Compound", &ReadOptions::new().exclude(["Tags", "Polarity", "ID"]).limit(1))
            .unwrap()
            .to_vec()
            .unwrap();
        let selected: Vec<&str> = items[0].properties().iter().map(|p| p.name()).collect();
        assert_eq!(selected, vec!["ID", "Name", "MolecularWeight", "Checked", "Area"]);
    }

    #[test]
    fn test_caller_clauses_yield_to_filter() {
        let fixture = Fixture::new(false);
        let eds = fixture.open();

        let options = ReadOptions::new().order("Area").desc(true).limit(2);
        let items = eds.read("Compound", &options).unwrap().to_vec().unwrap();
        assert_eq!(names(&items), vec!["Caffeine", "Theobromine"]);

        // the filter's ORDER BY and LIMIT win, the caller's offset fills in
        let options = ReadOptions::new()
            .filter("ORDER BY ID LIMIT 1")
            .order("Area")
            .desc(true)
            .limit(3)
            .offset(2);
        let items = eds.read("Compound", &options).unwrap().to_vec().unwrap();
        assert_eq!(names(&items), vec!["Paraxanthine"]);
    }

    #[test]
    fn test_lazy_iteration_restarts() {
        let fixture = Fixture::new(false);
        let eds = fixture.open();

        let mut read = eds.read("Compound", &ReadOptions::new().order("ID")).unwrap();
        let first = read.items().unwrap().next().unwrap().unwrap();
        assert_eq!(first.ids(), &[Value::Int(1)]);

        // a second pass starts over
        assert_eq!(read.items().unwrap().count(), 4);
    }

    #[test]
    fn test_read_many_keeps_input_order() {
        let fixture = Fixture::new(false);
        let eds = fixture.open();

        let ids = vec![vec![Value::Int(3)], vec![Value::Int(9)], vec![Value::Int(1)]];
        let items: Vec<EntityItem> = eds
            .read_many("Compound", ids, &ReadOptions::new().properties(["Name"]))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(names(&items), vec!["Paraxanthine", "Caffeine"]);

        let err = eds
            .read_many("Compound", vec![vec![Value::Int(1), Value::Int(2)]], &ReadOptions::new())
            .unwrap_err();
        assert!(matches!(err, EdsError::Validation(_)), "{err:?}");
    }

    #[test]
    fn test_count() {
        let fixture = Fixture::new(false);
        let eds = fixture.open();

        assert_eq!(eds.count("Compound", None).unwrap(), 4);
        assert_eq!(eds.count("Compounds", Some("Polarity = 1")).unwrap(), 2);
        assert_eq!(eds.count("Peak", Some("Area >= 400 LIMIT 1")).unwrap(), 3);
        assert_eq!(eds.count_connections("Compound", "Peak", None).unwrap(), 4);
        assert_eq!(
            eds.count_connections("Peak", "Compound", Some("\"Match Score\" > 0.5"))
                .unwrap(),
            3
        );
    }

    #[test]
    fn test_errors() {
        let fixture = Fixture::new(false);
        let eds = fixture.open();

        let err = eds.read("Chromatogram", &ReadOptions::new()).unwrap_err();
        assert!(matches!(err, EdsError::Schema(_)));

        let err = eds
            .read("Compound", &ReadOptions::new().properties(["Formula"]))
            .unwrap_err();
        insta::assert_snapshot!(err.to_string(), @"'Compound' doesn't contain property 'Formula'");

        let err = eds
            .read("Compound", &ReadOptions::new().properties(["Comment"]))
            .unwrap_err();
        insta::assert_snapshot!(err.to_string(), @"'Comment' is stored in the view file which is not available");

        let err = eds
            .read("Compound", &ReadOptions::new().filter("Name = "))
            .unwrap_err();
        assert!(matches!(err, EdsError::QuerySyntax { .. }));
    }

    #[test]
    fn test_close_and_reopen() {
        let fixture = Fixture::new(false);
        let mut eds = fixture.open();
        assert!(eds.is_open());

        eds.close();
        assert!(!eds.is_open());
        let err = eds.read("Compound", &ReadOptions::new()).unwrap_err();
        assert!(matches!(err, EdsError::ConnectionState(_)));

        assert!(eds.reopen().unwrap());
        assert_eq!(eds.count("Compound", None).unwrap(), 4);
    }

    #[test]
    fn test_settings_from_toml() {
        let fixture = Fixture::new(false);
        let settings = Settings::from_toml(
            r#"
            [storage]
            busy_timeout_ms = 100

            [query]
            memoize = false
            "#,
        )
        .unwrap();
        let eds = fixture.open_with(settings);

        assert!(!eds.settings().query.memoize);
        assert_eq!(eds.count("Compound", Some("(Polarity = 1)")).unwrap(), 2);
    }
}
