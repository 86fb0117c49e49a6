#[path = "../common/mod.rs"]
mod common;

#[cfg(test)]
mod tests {
    use super::common::Fixture;
    use eds::catalog::{Catalog, Connection, EntityType};

    /// Typical study layout:
    ///
    /// ```text
    /// Compound - Peak - Spectrum
    ///    |        |
    /// Feature - Chromatogram - Sample
    /// ```
    fn study() -> Catalog {
        let names = ["Compound", "Peak", "Spectrum", "Feature", "Chromatogram", "Sample"];
        let types: Vec<EntityType> = names
            .iter()
            .enumerate()
            .map(|(i, n)| EntityType::new(i as i64 + 1, n, &format!("{n}s")).with_display_name(&format!("{n}s")))
            .collect();
        let link = |a: usize, b: usize| {
            Connection::new(&types[a], &types[b], &format!("{}{}", types[a].table_name, types[b].table_name))
        };
        let connections = vec![
            link(0, 1),
            link(1, 2),
            link(0, 3),
            link(1, 4),
            link(3, 4),
            link(4, 5),
        ];
        Catalog::from_parts(types, connections).unwrap()
    }

    #[test]
    fn test_shortest_path() {
        let catalog = study();
        assert_eq!(
            catalog.find_path("Compound", "Sample", &[]).unwrap(),
            vec!["Compound", "Peak", "Chromatogram", "Sample"]
        );
        assert_eq!(
            catalog.find_path("Spectrum", "Feature", &[]).unwrap(),
            vec!["Spectrum", "Peak", "Compound", "Feature"]
        );
    }

    #[test]
    fn test_via_types() {
        let catalog = study();
        assert_eq!(
            catalog.find_path("Compound", "Sample", &["Feature"]).unwrap(),
            vec!["Compound", "Feature", "Chromatogram", "Sample"]
        );
        assert_eq!(
            catalog
                .find_path("Compound", "Chromatogram", &["Spectrum"])
                .unwrap(),
            Vec::<String>::new(),
            "Spectrum is a dead end"
        );
    }

    #[test]
    fn test_display_names_accepted() {
        let catalog = study();
        assert!(catalog.find_path("Compounds", "Spectra", &[]).is_err());
        assert_eq!(
            catalog.find_path("Compounds", "Spectrums", &[]).unwrap(),
            vec!["Compound", "Peak", "Spectrum"]
        );
    }

    #[test]
    fn test_path_is_simple() {
        let catalog = study();
        for (from, to) in [("Compound", "Sample"), ("Sample", "Spectrum"), ("Feature", "Peak")] {
            let path = catalog.find_path(from, to, &[]).unwrap();
            let mut unique = path.clone();
            unique.sort();
            unique.dedup();
            assert_eq!(unique.len(), path.len(), "{from} -> {to}: {path:?}");
            assert_eq!(path.first().map(String::as_str), Some(from));
            assert_eq!(path.last().map(String::as_str), Some(to));
        }
    }

    #[test]
    fn test_loaded_catalog() {
        let fixture = Fixture::new(false);
        let eds = fixture.open();

        assert_eq!(
            eds.get_path("Compound", "Spectrum", &[]).unwrap(),
            vec!["Compound", "Peak", "Spectrum"]
        );
        assert!(eds.get_path("Compound", "Sample", &[]).unwrap().is_empty());
        assert_eq!(eds.get_path("Peak", "Peak", &[]).unwrap(), vec!["Peak"]);
        assert!(eds.get_path("Compound", "Nope", &[]).is_err());
    }
}
