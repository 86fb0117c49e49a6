#[path = "../common/mod.rs"]
mod common;

#[cfg(test)]
mod tests {
    use super::common::Fixture;
    use eds::{Eds, EdsError, EntityItem, ReadOptions, Value};

    fn compound(eds: &Eds, id: i64) -> EntityItem {
        eds.read_many("Compound", vec![vec![Value::Int(id)]], &ReadOptions::new())
            .unwrap()
            .next()
            .unwrap()
            .unwrap()
    }

    fn ids(items: &[EntityItem]) -> Vec<i64> {
        items
            .iter()
            .map(|item| item.ids()[0].as_i64().unwrap())
            .collect()
    }

    #[test]
    fn test_children_of_parent() {
        let fixture = Fixture::new(false);
        let eds = fixture.open();
        let caffeine = compound(&eds, 1);

        let peaks = eds
            .read_connected("Peak", &caffeine, &ReadOptions::new().order("ID"))
            .unwrap()
            .to_vec()
            .unwrap();
        assert_eq!(ids(&peaks), vec![1, 2]);

        let peak = &peaks[0];
        assert_eq!(peak.connection().unwrap().table_name, "CompoundsPeaks");
        assert_eq!(peak.value("Match Score").unwrap(), &Value::Float(0.9));
        assert!(peak.property("Score").unwrap().is_from_connection());
        assert_eq!(peak.value("CompoundsID").unwrap(), &Value::Int(1));
        assert_eq!(peak.value("RT [min]").unwrap(), &Value::Float(1.5));
    }

    #[test]
    fn test_entity_column_wins_collision() {
        let fixture = Fixture::new(false);
        let eds = fixture.open();
        let caffeine = compound(&eds, 1);

        let peaks = eds
            .read_connected("Peak", &caffeine, &ReadOptions::new().filter("Area > 500"))
            .unwrap()
            .to_vec()
            .unwrap();
        // 600 on the peak, 60 on the link
        assert_eq!(ids(&peaks), vec![1]);
        assert_eq!(peaks[0].value("Area").unwrap(), &Value::Float(600.0));
        assert!(!peaks[0].property("Area").unwrap().is_from_connection());
    }

    #[test]
    fn test_filter_on_connection_property() {
        let fixture = Fixture::new(false);
        let eds = fixture.open();
        let caffeine = compound(&eds, 1);

        let read = eds
            .read_connected("Peak", &caffeine, &ReadOptions::new().filter("Score < 0.5"))
            .unwrap();
        insta::assert_snapshot!(read.sql(), @r#"SELECT "T1"."ID", "T1"."Area", "T1"."RetentionTime", "C1"."CompoundsID", "C1"."PeaksID", "C1"."Score" FROM "Peaks" AS "T1" INNER JOIN "CompoundsPeaks" AS "C1" ON "C1"."PeaksID" = "T1"."ID" WHERE "C1"."CompoundsID" = ? AND "C1"."Score" < ?"#);
        assert_eq!(
            read.params(),
            &[
                rusqlite::types::Value::Integer(1),
                rusqlite::types::Value::Real(0.5)
            ]
        );

        let mut read = read;
        let peaks = read.to_vec().unwrap();
        assert_eq!(ids(&peaks), vec![2]);
    }

    #[test]
    fn test_either_direction() {
        let fixture = Fixture::new(false);
        let eds = fixture.open();

        let peak = eds
            .read_many("Peak", vec![vec![Value::Int(3)]], &ReadOptions::new())
            .unwrap()
            .next()
            .unwrap()
            .unwrap();
        let compounds = eds
            .read_connected("Compound", &peak, &ReadOptions::new())
            .unwrap()
            .to_vec()
            .unwrap();
        assert_eq!(compounds.len(), 1);
        assert_eq!(compounds[0].value("Name").unwrap().to_string(), "Theobromine");
    }

    #[test]
    fn test_no_children() {
        let fixture = Fixture::new(false);
        let eds = fixture.open();
        let adenine = compound(&eds, 4);

        let peaks = eds
            .read_connected("Peak", &adenine, &ReadOptions::new())
            .unwrap()
            .to_vec()
            .unwrap();
        assert!(peaks.is_empty());
    }

    #[test]
    fn test_not_directly_connected() {
        let fixture = Fixture::new(false);
        let eds = fixture.open();
        let caffeine = compound(&eds, 1);

        let err = eds
            .read_connected("Spectrum", &caffeine, &ReadOptions::new())
            .unwrap_err();
        assert!(matches!(err, EdsError::Schema(_)), "{err:?}");
    }
}
