#[path = "../common/mod.rs"]
mod common;

#[cfg(test)]
mod tests {
    use super::common::Fixture;
    use eds::{Eds, EdsError, EntityItem, ReadOptions, Value};
    use rusqlite::types::Value as SqlValue;

    fn compounds(eds: &Eds) -> Vec<EntityItem> {
        eds.read("Compound", &ReadOptions::new().order("ID"))
            .unwrap()
            .to_vec()
            .unwrap()
    }

    fn stored(fixture: &Fixture, sql: &str) -> SqlValue {
        fixture.raw().query_row(sql, [], |row| row.get(0)).unwrap()
    }

    #[test]
    fn test_dirty_properties_written() {
        let fixture = Fixture::new(false);
        let eds = fixture.open();
        let mut items = compounds(&eds);

        items[0].set_value("Name", "Caffeine (std)").unwrap();
        items[1].set_value("Area", 750.0).unwrap();
        // same value leaves the property clean
        items[2].set_value("Calc. MW", 180.16).unwrap();
        assert!(!items[2].property("MolecularWeight").unwrap().is_dirty());

        assert_eq!(eds.update(&mut items, None).unwrap(), 4);
        assert!(items
            .iter()
            .flat_map(|item| item.properties())
            .all(|p| !p.is_dirty()));

        assert_eq!(
            stored(&fixture, "SELECT Name FROM Compounds WHERE ID = 1"),
            SqlValue::Text("Caffeine (std)".into())
        );
        assert_eq!(
            stored(&fixture, "SELECT Area FROM Compounds WHERE ID = 2"),
            SqlValue::Real(750.0)
        );
        assert_eq!(
            stored(&fixture, "SELECT Area FROM Compounds WHERE ID = 3"),
            SqlValue::Real(250.0)
        );
        assert_eq!(
            stored(&fixture, "SELECT Area FROM Compounds WHERE ID = 4"),
            SqlValue::Null
        );
    }

    #[test]
    fn test_explicit_properties() {
        let fixture = Fixture::new(false);
        let eds = fixture.open();
        let mut items = compounds(&eds);
        let caffeine = &mut items[..1];

        caffeine[0].set_value("Name", "Guaranine").unwrap();
        caffeine[0].set_value("Area", 1.0).unwrap();
        assert_eq!(eds.update(caffeine, Some(&["Name"][..])).unwrap(), 1);

        assert!(!caffeine[0].property("Name").unwrap().is_dirty());
        assert!(caffeine[0].property("Area").unwrap().is_dirty());
        assert_eq!(
            stored(&fixture, "SELECT Name || '/' || Area FROM Compounds WHERE ID = 1"),
            SqlValue::Text("Guaranine/1000.0".into())
        );
    }

    #[test]
    fn test_last_change_stamped() {
        let fixture = Fixture::new(false);
        let eds = fixture.open();
        let name = eds.catalog().get_type("Compound").unwrap().column("Name").unwrap().clone();
        assert_eq!(name.last_change.get(), None);

        let mut items = compounds(&eds);
        items[0].set_value("Name", "Guaranine").unwrap();
        eds.update(&mut items, None).unwrap();

        let raw = stored(&fixture, "SELECT LastChange FROM DataTypesColumns WHERE ColumnID = 2");
        let SqlValue::Text(stamp) = raw else {
            panic!("LastChange not written: {raw:?}");
        };
        assert!(stamp.ends_with('Z'), "{stamp}");
        assert_eq!(stamp.len(), "2024-01-01 00:00:00.000000Z".len());
        // the loaded column sees the stored stamp
        assert_eq!(name.last_change.get().as_deref(), Some(stamp.as_str()));
        assert_eq!(
            items[0].property("Name").unwrap().column().last_change.get(),
            Some(stamp)
        );

        // columns that were not written keep their stamp
        assert_eq!(
            stored(&fixture, "SELECT LastChange FROM DataTypesColumns WHERE ColumnID = 7"),
            SqlValue::Null
        );
    }

    #[test]
    fn test_failed_update_leaves_last_change() {
        let fixture = Fixture::new(false);
        let eds = fixture.open();
        let mut items = compounds(&eds);

        items[0].set_value("Name", "Guaranine").unwrap();
        fixture
            .raw()
            .execute_batch(
                "CREATE TRIGGER no_names BEFORE UPDATE OF Name ON Compounds \
                 BEGIN SELECT RAISE(ABORT, 'read only'); END;",
            )
            .unwrap();
        assert!(matches!(eds.update(&mut items, None), Err(EdsError::Sqlite(_))));

        assert_eq!(
            stored(&fixture, "SELECT LastChange FROM DataTypesColumns WHERE ColumnID = 2"),
            SqlValue::Null
        );
        let name = items[0].property("Name").unwrap();
        assert!(name.is_dirty());
        assert_eq!(name.column().last_change.get(), None);
    }

    #[test]
    fn test_backup_keeps_previous_values() {
        let fixture = Fixture::new(false);
        let eds = fixture.open();
        let copy = eds.backup().unwrap();

        let mut items = compounds(&eds);
        items[0].set_value("Name", "Guaranine").unwrap();
        eds.update(&mut items[..1], None).unwrap();

        let name: String = rusqlite::Connection::open(&copy)
            .unwrap()
            .query_row("SELECT Name FROM Compounds WHERE ID = 1", [], |row| row.get(0))
            .unwrap();
        assert_eq!(name, "Caffeine");
        assert_eq!(
            stored(&fixture, "SELECT Name FROM Compounds WHERE ID = 1"),
            SqlValue::Text("Guaranine".into())
        );
    }

    #[test]
    fn test_check_and_tags() {
        let fixture = Fixture::new(false);
        let eds = fixture.open();
        let mut items = compounds(&eds);

        items[0].check(true).unwrap();
        items[0].tag(2, true).unwrap();
        assert!(items[0].tagged(2).unwrap());
        eds.update(&mut items[..1], None).unwrap();

        assert_eq!(
            stored(&fixture, "SELECT Checked FROM Compounds WHERE ID = 1"),
            SqlValue::Integer(1)
        );
        assert_eq!(
            stored(&fixture, "SELECT Tags FROM Compounds WHERE ID = 1"),
            SqlValue::Blob(vec![0, 0, 0, 0, 1, 1])
        );

        let reread = compounds(&eds);
        assert_eq!(reread[0].value("Checked").unwrap(), &Value::Bool(true));
        assert!(reread[0].tagged(2).unwrap());
        assert!(!reread[0].tagged(0).unwrap());
        assert!(!reread[1].tagged(2).unwrap());
    }

    #[test]
    fn test_rejected_properties() {
        let fixture = Fixture::new(false);
        let eds = fixture.open();
        let mut items = compounds(&eds);

        let err = eds.update(&mut items, Some(&["ID"][..])).unwrap_err();
        assert!(matches!(err, EdsError::Validation(_)), "{err:?}");

        items[0].add_value("Rank", 1).unwrap();
        let err = eds.update(&mut items[..1], Some(&["Rank"][..])).unwrap_err();
        assert!(matches!(err, EdsError::Validation(_)), "{err:?}");

        let err = eds.update(&mut items, Some(&["Formula"][..])).unwrap_err();
        assert!(matches!(err, EdsError::Schema(_)), "{err:?}");

        // a view column needs the view store
        let err = eds.update(&mut items, Some(&["Comment"][..])).unwrap_err();
        assert!(matches!(err, EdsError::Validation(_)), "{err:?}");

        let err = items[0].set_value("Checked", Value::Null).unwrap_err();
        assert!(matches!(err, EdsError::Validation(_)), "{err:?}");
    }

    #[test]
    fn test_connection_property_rejected() {
        let fixture = Fixture::new(false);
        let eds = fixture.open();
        let items = compounds(&eds);

        let mut peaks = eds
            .read_connected("Peak", &items[0], &ReadOptions::new())
            .unwrap()
            .to_vec()
            .unwrap();
        peaks[0].set_value("Match Score", 0.1).unwrap();
        let err = eds.update(&mut peaks, None).unwrap_err();
        assert!(matches!(err, EdsError::Validation(_)), "{err:?}");
        assert_eq!(
            stored(&fixture, "SELECT Score FROM CompoundsPeaks WHERE CompoundsID = 1 AND PeaksID = 1"),
            SqlValue::Real(0.9)
        );
    }

    #[test]
    fn test_mixed_types_and_empty_input() {
        let fixture = Fixture::new(false);
        let eds = fixture.open();
        let mut items = compounds(&eds);
        let peak = eds
            .read("Peak", &ReadOptions::new().limit(1))
            .unwrap()
            .to_vec()
            .unwrap()
            .remove(0);
        items.push(peak);

        let err = eds.update(&mut items, None).unwrap_err();
        assert!(matches!(err, EdsError::Validation(_)), "{err:?}");

        assert_eq!(eds.update(&mut [], None).unwrap(), 0);
        // nothing dirty, nothing written
        let mut clean = compounds(&eds);
        assert_eq!(eds.update(&mut clean, None).unwrap(), 0);
    }
}
