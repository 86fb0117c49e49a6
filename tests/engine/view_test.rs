#[path = "../common/mod.rs"]
mod common;

#[cfg(test)]
mod tests {
    use super::common::Fixture;
    use eds::config::Settings;
    use eds::{Eds, EntityItem, ReadOptions, Value};
    use rusqlite::types::Value as SqlValue;

    fn compounds(eds: &Eds) -> Vec<EntityItem> {
        eds.read("Compound", &ReadOptions::new().order("ID"))
            .unwrap()
            .to_vec()
            .unwrap()
    }

    fn comments(fixture: &Fixture) -> Vec<(i64, String)> {
        let conn = fixture.raw_view();
        let mut stmt = conn
            .prepare("SELECT ID, Comment FROM Compounds_Comment ORDER BY ID")
            .unwrap();
        stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap()
    }

    #[test]
    fn test_read_view_column() {
        let fixture = Fixture::new(true);
        let eds = fixture.open();
        assert!(eds.database().has_view_store());

        let items = compounds(&eds);
        assert_eq!(
            items[0].value("Comment").unwrap(),
            &Value::from("reference standard")
        );
        assert!(items[1..]
            .iter()
            .all(|item| item.value("Comment").unwrap().is_null()));
    }

    #[test]
    fn test_view_store_detached_after_read() {
        let fixture = Fixture::new(true);
        let eds = fixture.open();

        let mut read = eds
            .read("Compound", &ReadOptions::new().properties(["Comment"]))
            .unwrap();
        insta::assert_snapshot!(read.sql(), @r#"SELECT "T1"."ID", "V1"."Comment" FROM "Compounds" AS "T1" LEFT JOIN "view_store"."Compounds_Comment" AS "V1" ON "V1"."ID" = "T1"."ID""#);
        assert_eq!(eds.database().view_depth(), 1);
        assert_eq!(read.to_vec().unwrap().len(), 4);
        drop(read);
        assert_eq!(eds.database().view_depth(), 0);

        // types without view columns never attach
        let read = eds.read("Peak", &ReadOptions::new()).unwrap();
        assert_eq!(eds.database().view_depth(), 0);
        drop(read);
    }

    #[test]
    fn test_filter_on_view_column() {
        let fixture = Fixture::new(true);
        let eds = fixture.open();

        let items = eds
            .read("Compound", &ReadOptions::new().filter("Comment LIKE 'ref%'"))
            .unwrap()
            .to_vec()
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].ids(), &[Value::Int(1)]);

        assert_eq!(eds.count("Compound", Some("Comment IS NULL")).unwrap(), 3);
    }

    #[test]
    fn test_update_view_column() {
        let fixture = Fixture::new(true);
        let eds = fixture.open();
        let mut items = compounds(&eds);

        items[0].set_value("Comment", "internal standard").unwrap();
        items[2].set_value("Comment", "impurity").unwrap();
        items[2].set_value("Area", 300.0).unwrap();
        assert_eq!(eds.update(&mut items[..3], None).unwrap(), 3);
        assert_eq!(eds.database().view_depth(), 0);

        // existing rows are updated, missing rows inserted
        assert_eq!(
            comments(&fixture),
            vec![
                (1, "internal standard".to_string()),
                (3, "impurity".to_string()),
            ]
        );
        let area: SqlValue = fixture
            .raw()
            .query_row("SELECT Area FROM Compounds WHERE ID = 3", [], |row| row.get(0))
            .unwrap();
        assert_eq!(area, SqlValue::Real(300.0));

        let reread = compounds(&eds);
        assert_eq!(reread[2].value("Comment").unwrap(), &Value::from("impurity"));
    }

    #[test]
    fn test_view_store_disabled() {
        let fixture = Fixture::new(true);
        let mut settings = Settings::default();
        settings.storage.attach_view = false;
        let eds = fixture.open_with(settings);

        assert!(!eds.database().has_view_store());
        let items = compounds(&eds);
        assert!(!items[0].has_property("Comment"));
    }
}
