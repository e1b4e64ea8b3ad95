use super::*;
use crate::models::{Finish, Legality, OwnedCardRecord, Prices, ReferenceCard, Variant};

struct CardBuilder {
    card: ReferenceCard,
    quantity: u32,
    origin: String,
    finish: Finish,
    type_label: String,
}

fn card(id: &str, name: &str) -> CardBuilder {
    CardBuilder {
        card: ReferenceCard {
            object: "card".to_string(),
            id: id.to_string(),
            oracle_id: Some(format!("oracle-{id}")),
            name: name.to_string(),
            lang: "en".to_string(),
            rarity: "common".to_string(),
            type_line: Some("Instant".to_string()),
            colors: Some(vec!["R".to_string()]),
            ..Default::default()
        },
        quantity: 1,
        origin: "binder.csv".to_string(),
        finish: Finish::Normal,
        type_label: "Instant".to_string(),
    }
}

impl CardBuilder {
    fn oracle(mut self, oracle: &str) -> Self {
        self.card.oracle_id = Some(oracle.to_string());
        self
    }

    fn colors(mut self, colors: &[&str]) -> Self {
        self.card.colors = Some(colors.iter().map(|c| c.to_string()).collect());
        self
    }

    fn no_colors(mut self) -> Self {
        self.card.colors = None;
        self
    }

    fn type_line(mut self, type_line: &str) -> Self {
        self.card.type_line = Some(type_line.to_string());
        self
    }

    fn legal_in(mut self, formats: &[&str]) -> Self {
        for format in formats {
            self.card.legalities.insert(format.to_string(), Legality::Legal);
        }
        self
    }

    fn banned_in(mut self, format: &str) -> Self {
        self.card.legalities.insert(format.to_string(), Legality::Banned);
        self
    }

    fn quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }

    fn origin(mut self, origin: &str) -> Self {
        self.origin = origin.to_string();
        self
    }

    fn eur(mut self, price: &str) -> Self {
        self.card.prices = Prices {
            eur: Some(price.to_string()),
            ..Default::default()
        };
        self
    }

    fn label(mut self, label: &str) -> Self {
        self.type_label = label.to_string();
        self
    }

    fn build(self) -> NormalizedCard {
        let record = OwnedCardRecord {
            identity: self.card.id.clone(),
            name: None,
            variant: Variant {
                finish: self.finish,
                language: "English".to_string(),
            },
            quantity: self.quantity,
            origin: self.origin,
            extra: Default::default(),
            tags: Default::default(),
        };
        NormalizedCard::new(self.card, &record, self.type_label)
    }
}

fn names(cards: &[NormalizedCard]) -> Vec<&str> {
    cards.iter().map(|c| c.name()).collect()
}

mod kind_tests {
    use super::*;

    #[test]
    fn test_single_and_multiple_colors() {
        assert_eq!(kind_of(&card("a", "Bolt").build()), Kind::Red);
        assert_eq!(kind_of(&card("b", "Swords").colors(&["W"]).build()), Kind::White);
        assert_eq!(
            kind_of(&card("c", "Fire // Ice").colors(&["R", "U"]).build()),
            Kind::Multicolor
        );
    }

    #[test]
    fn test_colorless_split_by_type_line() {
        let sol_ring = card("a", "Sol Ring").colors(&[]).type_line("Artifact").build();
        let wastes = card("b", "Wastes").colors(&[]).type_line("Basic Land").build();
        let strip = card("c", "Strip Mine").colors(&[]).type_line("Land").build();
        let ugin = card("d", "Ugin").colors(&[]).type_line("Legendary Planeswalker - Ugin").build();

        assert_eq!(kind_of(&sol_ring), Kind::Artifact);
        assert_eq!(kind_of(&wastes), Kind::BasicLand);
        assert_eq!(kind_of(&strip), Kind::Land);
        assert_eq!(kind_of(&ugin), Kind::Colorless);
    }

    #[test]
    fn test_devoid_takes_colors_from_cost() {
        let mut spawn = card("a", "Eldrazi Skyspawner")
            .colors(&[])
            .type_line("Creature - Eldrazi Drone")
            .build();
        spawn.card.keywords = vec!["Devoid".to_string()];
        spawn.card.mana_cost = Some("{2}{U}".to_string());
        assert_eq!(kind_of(&spawn), Kind::Blue);

        spawn.card.mana_cost = Some("{1}{U/B}{B}".to_string());
        assert_eq!(kind_of(&spawn), Kind::Multicolor);
    }

    #[test]
    fn test_missing_colors_are_unsorted() {
        assert_eq!(kind_of(&card("a", "Mystery").no_colors().build()), Kind::Unsorted);
    }

    #[test]
    fn test_cost_colors_in_wubrg_order() {
        assert_eq!(colors_from_cost("{G}{1}{W}"), vec!["W", "G"]);
        assert!(colors_from_cost("{3}").is_empty());
    }
}

mod partition_tests {
    use super::*;

    #[test]
    fn test_known_names_first_then_alphabetical() {
        let items = vec!["zeta", "alpha", "mythic", "beta", "common"];
        let buckets = partition(items, &["mythic", "common"], |s| {
            if s.len() > 5 {
                s.to_string()
            } else {
                format!("other-{s}")
            }
        });
        let order: Vec<&str> = buckets.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(
            order,
            vec!["mythic", "common", "other-alpha", "other-beta", "other-zeta"]
        );
    }

    #[test]
    fn test_empty_input_has_no_buckets() {
        let buckets: Vec<Bucket<u32>> = partition(Vec::new(), &["a"], |_| "a".to_string());
        assert!(buckets.is_empty());
    }
}

mod categorizer_tests {
    use super::*;

    #[test]
    fn test_formats_are_tried_in_order() {
        let cards = vec![
            card("a", "Bolt").legal_in(&["premodern", "modern"]).build(),
            card("b", "Snapcaster").legal_in(&["modern"]).banned_in("premodern").build(),
            card("c", "Oko").banned_in("modern").build(),
            card("d", "Forest")
                .colors(&[])
                .type_line("Basic Land - Forest")
                .legal_in(&["premodern", "modern"])
                .build(),
        ];

        let buckets = Categorizer::new(["premodern", "modern"]).categorize(cards);
        let order: Vec<&str> = buckets.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(order, vec![BASIC_LAND_BUCKET, "premodern", "modern", UNSORTED_BUCKET]);

        let modern = buckets.iter().find(|b| b.name == "modern").unwrap();
        let modern_names: Vec<&str> = flatten(std::slice::from_ref(modern))
            .into_iter()
            .map(|c| c.name())
            .collect();
        assert_eq!(modern_names, vec!["Snapcaster"]);
        let unsorted = buckets.iter().find(|b| b.name == UNSORTED_BUCKET).unwrap();
        assert_eq!(unsorted.card_count(), 1);
    }

    #[test]
    fn test_legacy_formats_use_original_rarity() {
        let mut bolt = card("a", "Bolt").legal_in(&["premodern", "modern"]).build();
        bolt.rarity_orig = "common".to_string();
        bolt.rarity_recent = "uncommon".to_string();

        let buckets = Categorizer::new(["premodern"]).categorize(vec![bolt.clone()]);
        assert_eq!(buckets[0].items[0].name, "common");

        let buckets = Categorizer::new(["modern"]).categorize(vec![bolt]);
        assert_eq!(buckets[0].items[0].name, "uncommon");
    }

    #[test]
    fn test_every_card_lands_in_exactly_one_leaf() {
        let cards: Vec<NormalizedCard> = (0..20)
            .map(|i| {
                let colors: &[&str] = match i % 4 {
                    0 => &["W"],
                    1 => &["U", "B"],
                    2 => &[],
                    _ => &["G"],
                };
                let formats: &[&str] = if i % 3 == 0 { &["modern"] } else { &[] };
                let mut c = card(&format!("id{i}"), &format!("Card {i:02}"))
                    .colors(colors)
                    .legal_in(formats)
                    .build();
                c.rarity_recent = ["common", "rare", "mythic"][i % 3].to_string();
                c
            })
            .collect();

        let buckets = Categorizer::new(["modern"]).categorize(cards);
        let mut seen: Vec<String> = flatten(&buckets).iter().map(|c| c.card.id.clone()).collect();
        assert_eq!(seen.len(), 20);
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 20);
        assert_eq!(into_cards(buckets).len(), 20);
    }

    #[test]
    fn test_leaf_cards_sorted_by_name_then_price() {
        let cards = vec![
            card("a", "Counterspell").eur("0.50").build(),
            card("b", "Bolt").build(),
            card("c", "Bolt").eur("2.00").build(),
            card("d", "Bolt").eur("9.99").build(),
        ];
        let buckets = Categorizer::new(Vec::<String>::new()).categorize(cards);
        let leaf = &buckets[0].items[0].items[0];
        let ids: Vec<&str> = leaf.items.iter().map(|c| c.card.id.as_str()).collect();
        assert_eq!(ids, vec!["d", "c", "b", "a"]);
    }

    #[test]
    fn test_flattened_cards_remember_their_buckets() {
        let cards = vec![
            card("a", "Bolt").legal_in(&["modern"]).build(),
            card("b", "Counterspell").colors(&["U"]).build(),
        ];
        let cards = into_cards(Categorizer::new(["modern"]).categorize(cards));

        let path = |name: &str| {
            cards
                .iter()
                .find(|c| c.name() == name)
                .and_then(|c| c.bucket.clone())
                .unwrap()
        };
        assert_eq!(
            path("Bolt"),
            BucketPath {
                format: "modern".to_string(),
                rarity: "common".to_string(),
                kind: "R".to_string(),
            }
        );
        assert_eq!(path("Counterspell").format, UNSORTED_BUCKET);
        assert_eq!(path("Counterspell").kind, "U");
    }

    #[test]
    fn test_sort_by_type_groups_labels_first() {
        let cards = vec![
            card("a", "Abrade").label("Sorcery").build(),
            card("b", "Bolt").label("Instant").build(),
        ];
        let sorted = Categorizer::new(Vec::<String>::new())
            .with_sort(SortOptions { by_type: true })
            .categorize(cards.clone());
        assert_eq!(names(&into_cards(sorted)), vec!["Bolt", "Abrade"]);

        let plain = Categorizer::new(Vec::<String>::new()).categorize(cards);
        assert_eq!(names(&into_cards(plain)), vec!["Abrade", "Bolt"]);
    }

    #[test]
    fn test_summary_lists_every_level() {
        let buckets = Categorizer::new(["modern"]).categorize(vec![
            card("a", "Bolt").legal_in(&["modern"]).build(),
        ]);
        let summary = format_summary(&buckets);
        assert!(summary.contains("modern (1 cards)"));
        assert!(summary.contains("  common (1)"));
        assert!(summary.contains("    R: 1"));
    }
}

mod merge_mark_tests {
    use super::*;

    fn marked() -> BTreeSet<String> {
        ["new.csv".to_string()].into_iter().collect()
    }

    #[test]
    fn test_marks_follow_copy_limit() {
        let mut cards = vec![
            card("x", "Bolt").oracle("bolt").quantity(3).build(),
            card("x", "Bolt").oracle("bolt").quantity(2).origin("new.csv").build(),
            card("x", "Bolt").oracle("bolt").quantity(1).origin("new.csv").build(),
            card("y", "Counterspell").oracle("counter").origin("new.csv").build(),
        ];
        apply_merge_marks(&mut cards, &marked(), &GroupMap::new());

        assert_eq!(cards[0].mark, None);
        assert_eq!(cards[1].mark, Some(Mark::Error));
        assert_eq!(cards[2].mark, Some(Mark::Warning));
        assert_eq!(cards[3].mark, Some(Mark::Ok));
    }

    #[test]
    fn test_other_printing_is_a_warning() {
        let mut cards = vec![
            card("x", "Bolt").oracle("bolt").quantity(4).build(),
            card("z", "Bolt").oracle("bolt").quantity(4).origin("new.csv").build(),
        ];
        apply_merge_marks(&mut cards, &marked(), &GroupMap::new());
        assert_eq!(cards[1].mark, Some(Mark::Warning));
    }

    #[test]
    fn test_proxies_are_neither_counted_nor_marked() {
        let mut groups = GroupMap::new();
        groups
            .entry(Group::Proxy)
            .or_default()
            .extend(["proxies.csv".to_string(), "new.csv".to_string()]);

        let mut cards = vec![
            card("x", "Bolt").oracle("bolt").quantity(4).origin("proxies.csv").build(),
            card("x", "Bolt").oracle("bolt").quantity(1).origin("new.csv").build(),
        ];
        apply_merge_marks(&mut cards, &marked(), &groups);
        assert_eq!(cards[0].mark, None);
        assert_eq!(cards[1].mark, None);
    }

    #[test]
    fn test_marks_are_computed_per_format_bucket() {
        let cards = vec![
            card("x", "Bolt").oracle("bolt").quantity(3).legal_in(&["modern"]).build(),
            card("x", "Bolt")
                .oracle("bolt")
                .quantity(2)
                .origin("new.csv")
                .legal_in(&["premodern"])
                .build(),
        ];
        let buckets = Categorizer::new(["premodern", "modern"])
            .with_marked(["new.csv"])
            .categorize(cards);
        let marked: Vec<Option<Mark>> = into_cards(buckets).iter().map(|c| c.mark).collect();
        assert_eq!(marked, vec![Some(Mark::Ok), None]);
    }
}
