#[path = "../common/mod.rs"]
mod common;

#[cfg(test)]
mod tests {
    use super::common::Fixture;
    use eds::catalog::{Catalog, STORAGE_FILE_OPTION};
    use eds::convert::{
        ConversionStage, ConvertError, ConverterRegistry, SpecialType, Value, ValueConverter,
    };
    use eds::EdsError;
    use rusqlite::types::Value as SqlValue;

    /// Stores daltons, exposes kilodaltons.
    #[derive(Debug)]
    struct Kilodalton;

    impl ValueConverter for Kilodalton {
        fn convert(&self, value: Value) -> Result<Value, ConvertError> {
            match value {
                Value::Float(f) => Ok(Value::Float(f / 1000.0)),
                Value::Null => Ok(Value::Null),
                other => Err(ConvertError::new(format!("not a mass: {}", other.kind()))),
            }
        }

        fn revert(&self, value: Value) -> Result<Value, ConvertError> {
            match value {
                Value::Float(f) => Ok(Value::Float(f * 1000.0)),
                other => Ok(other),
            }
        }
    }

    fn load(fixture: &Fixture, registry: &ConverterRegistry) -> Catalog {
        let conn = fixture.raw();
        Catalog::load(&conn, registry).unwrap()
    }

    #[test]
    fn test_types_and_columns() {
        let fixture = Fixture::new(false);
        let catalog = load(&fixture, &ConverterRegistry::new());

        assert_eq!(catalog.type_count(), 4);
        let compound = catalog.get_type("Compound").unwrap();
        assert_eq!(compound.table_name, "Compounds");
        assert_eq!(compound.columns.len(), 8);

        let ids: Vec<&str> = compound
            .id_columns()
            .iter()
            .map(|c| c.column_name.as_str())
            .collect();
        assert_eq!(ids, vec!["ID"]);

        let mw = compound.column("Calc. MW").unwrap();
        assert_eq!(mw.column_name, "MolecularWeight");
        assert_eq!(mw.data_purpose.as_deref(), Some("MolecularWeight"));
        assert_eq!(mw.data_type.as_ref().unwrap().name, "Double");
    }

    #[test]
    fn test_display_name_lookup() {
        let fixture = Fixture::new(false);
        let catalog = load(&fixture, &ConverterRegistry::new());

        assert_eq!(catalog.get_type("Spectra").unwrap().name, "Spectrum");
        assert!(catalog.has_type("Samples"));
        let err = catalog.get_type("Chromatogram").unwrap_err();
        assert!(matches!(err, EdsError::Schema(_)));
    }

    #[test]
    fn test_view_column_flag() {
        let fixture = Fixture::new(false);
        let catalog = load(&fixture, &ConverterRegistry::new());

        let compound = catalog.get_type("Compound").unwrap();
        let comment = compound.column("Comment").unwrap();
        assert!(comment.is_in_view_file());
        assert_eq!(
            comment.extended_data.get(STORAGE_FILE_OPTION).map(String::as_str),
            Some("View")
        );
        assert!(compound.has_view_columns());
        assert!(!catalog.get_type("Peak").unwrap().has_view_columns());
    }

    #[test]
    fn test_special_types_attached() {
        let fixture = Fixture::new(false);
        let catalog = load(&fixture, &ConverterRegistry::new());
        let compound = catalog.get_type("Compound").unwrap();

        let polarity = compound.column("Polarity").unwrap();
        let Some(SpecialType::Enum(polarity_type)) = &polarity.special else {
            panic!("Polarity should be an enum column");
        };
        assert_eq!(polarity_type.name(), "Polarity");
        assert_eq!(polarity_type.elements().len(), 2);

        let value = polarity.convert(&SqlValue::Integer(2)).unwrap();
        assert_eq!(value.as_enum().unwrap().display_name(), "Negative");

        let tags = compound.column("Tags").unwrap();
        let Some(SpecialType::Distribution(map)) = &tags.special else {
            panic!("Tags should be a distribution column");
        };
        assert_eq!(map.len(), 3);
        assert_eq!(map.boxes()[1].name, "Green");
        assert!(catalog.distribution_map(1).is_some());
        assert!(catalog.enum_type(1).is_some());
        assert_eq!(catalog.custom_type(5).unwrap().name, "Binary");
    }

    #[test]
    fn test_connection_columns() {
        let fixture = Fixture::new(false);
        let catalog = load(&fixture, &ConverterRegistry::new());

        let connection = catalog.get_connection("Peak", "Compound").unwrap();
        assert_eq!(connection.table_name, "CompoundsPeaks");
        let names: Vec<&str> = connection
            .columns
            .iter()
            .map(|c| c.column_name.as_str())
            .collect();
        assert_eq!(names, vec!["CompoundsID", "PeaksID", "Score", "Area"]);
        assert_eq!(connection.id_columns().len(), 2);

        assert!(catalog.has_connection("Spectra", "Peaks"));
        let err = catalog.get_connection("Compound", "Spectrum").unwrap_err();
        insta::assert_snapshot!(err.to_string(), @"'Compound' doesn't contain direct connection to 'Spectrum'");
    }

    #[test]
    fn test_neighbours() {
        let fixture = Fixture::new(false);
        let catalog = load(&fixture, &ConverterRegistry::new());

        let neighbours: Vec<&str> = catalog
            .neighbours("Peak")
            .unwrap()
            .into_iter()
            .map(|(ty, _)| ty.name.as_str())
            .collect();
        assert_eq!(neighbours, vec!["Compound", "Spectrum"]);
        assert!(catalog.neighbours("Sample").unwrap().is_empty());
    }

    #[test]
    fn test_domain_converter_by_purpose() {
        let fixture = Fixture::new(false);
        let registry = ConverterRegistry::new().with("molecularweight", Kilodalton);
        let catalog = load(&fixture, &registry);

        let mw = catalog.get_type("Compound").unwrap().column("MolecularWeight").unwrap();
        assert!(mw.converter.is_some());
        assert_eq!(mw.convert(&SqlValue::Real(194.0)).unwrap(), Value::Float(0.194));
        assert_eq!(mw.revert(Value::Float(0.5)).unwrap(), SqlValue::Real(500.0));

        let err = mw.convert(&SqlValue::Text("heavy".into())).unwrap_err();
        match err {
            EdsError::Conversion { column, stage, .. } => {
                assert_eq!(column, "MolecularWeight");
                assert_eq!(stage, ConversionStage::Basic);
            }
            other => panic!("expected conversion error, got {other:?}"),
        }

        let name = catalog.get_type("Compound").unwrap().column("Name").unwrap();
        assert!(name.converter.is_none());
    }

    #[test]
    fn test_workflows_and_messages() {
        let fixture = Fixture::new(false);
        let catalog = load(&fixture, &ConverterRegistry::new());

        let names: Vec<_> = catalog
            .workflows()
            .map(|w| w.name.as_deref().unwrap())
            .collect();
        assert_eq!(names, vec!["Processing", "Consensus"]);

        let processing = catalog.workflow(1).unwrap();
        assert_eq!(processing.study.as_deref(), Some("Caffeine study"));
        assert_eq!(processing.version, Some(3));
        assert_eq!(
            processing.start_date.unwrap().to_string(),
            "2021-03-04 10:11:12"
        );
        assert_eq!(processing.xml.as_deref(), Some("<Workflow />"));

        let messages: Vec<_> = processing
            .messages
            .iter()
            .map(|m| (m.node_name.as_deref().unwrap(), m.time.unwrap().to_string()))
            .collect();
        assert_eq!(
            messages,
            vec![
                ("Input Files", "2021-03-04 10:11:12".to_string()),
                ("Detect Compounds", "2021-03-04 10:11:18".to_string()),
            ]
        );
        assert_eq!(processing.messages[1].kind, Some(1));

        // messages of unknown workflows are dropped
        assert_eq!(catalog.workflows().map(|w| w.messages.len()).sum::<usize>(), 2);
        assert!(catalog.workflow(2).unwrap().messages.is_empty());
        assert!(catalog.workflow(9).is_none());
    }

    #[test]
    fn test_workflow_tables_optional() {
        let fixture = Fixture::new(false);
        fixture
            .raw()
            .execute_batch("DROP TABLE WorkflowMessages; DROP TABLE Workflows;")
            .unwrap();
        let catalog = load(&fixture, &ConverterRegistry::new());
        assert_eq!(catalog.workflows().count(), 0);
        assert_eq!(catalog.type_count(), 4);
    }
}
