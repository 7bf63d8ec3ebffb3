use super::*;

fn section(name: &str, content: Vec<u8>, relocations: Vec<sobj::Relocation>) -> sobj::Section {
    sobj::Section {
        name: name.to_owned(),
        length: content.len() as u32,
        content,
        relocations,
    }
}

fn defined(name: &str, value: u32, section_name: &str) -> sobj::Symbol {
    sobj::Symbol {
        name: name.to_owned(),
        value,
        is_defined: true,
        section: Some(section_name.to_owned()),
    }
}

fn undefined(name: &str) -> sobj::Symbol {
    sobj::Symbol {
        name: name.to_owned(),
        value: 0,
        is_defined: false,
        section: None,
    }
}

fn object(sections: Vec<sobj::Section>, symbols: Vec<sobj::Symbol>) -> sobj::ObjectFile {
    sobj::ObjectFile { sections, symbols }
}

fn placements(entries: &[(u32, &str)]) -> BTreeMap<u32, String> {
    entries
        .iter()
        .map(|(address, name)| (*address, (*name).to_owned()))
        .collect()
}

#[test]
fn same_named_sections_concatenate_in_file_order() {
    let a = object(
        vec![
            section("text", vec![0xAA; 0x10], Vec::new()),
            section("data", vec![0xBB; 0x20], Vec::new()),
        ],
        Vec::new(),
    );
    let b = object(vec![section("text", vec![0xCC; 8], Vec::new())], Vec::new());

    let image = link(
        vec![("a.o".to_owned(), a), ("b.o".to_owned(), b)],
        &placements(&[(0x4000_0000, "text")]),
    )
    .unwrap();

    let blocks: Vec<(u32, usize, u8)> = image
        .iter()
        .map(|(address, bytes)| (*address, bytes.len(), bytes[0]))
        .collect();
    assert_eq!(
        blocks,
        vec![
            (0x4000_0000, 0x10, 0xAA),
            (0x4000_0010, 0x08, 0xCC),
            (0x4000_0018, 0x20, 0xBB),
        ]
    );
}

#[test]
fn unplaced_sections_follow_in_encounter_order() {
    let a = object(
        vec![
            section("text", vec![1; 4], Vec::new()),
            section("data", vec![2; 4], Vec::new()),
        ],
        Vec::new(),
    );
    let b = object(vec![section("more", vec![3; 4], Vec::new())], Vec::new());

    let image = link(
        vec![("a.o".to_owned(), a), ("b.o".to_owned(), b)],
        &BTreeMap::new(),
    )
    .unwrap();

    let addresses: Vec<u32> = image.keys().copied().collect();
    assert_eq!(addresses, vec![0, 4, 8]);
    assert_eq!(image[&0], vec![1; 4]);
    assert_eq!(image[&4], vec![2; 4]);
    assert_eq!(image[&8], vec![3; 4]);
}

#[test]
fn placement_overlap_is_fatal() {
    let a = object(
        vec![
            section("one", vec![0; 0x20], Vec::new()),
            section("two", vec![0; 4], Vec::new()),
        ],
        Vec::new(),
    );

    let result = link(
        vec![("a.o".to_owned(), a)],
        &placements(&[(0x100, "one"), (0x110, "two")]),
    );
    assert!(matches!(result, Err(Error::PlacementOverlap { .. })));
}

#[test]
fn running_past_the_address_space_is_fatal() {
    let a = object(vec![section("big", vec![0; 0x20], Vec::new())], Vec::new());

    let result = link(
        vec![("a.o".to_owned(), a)],
        &placements(&[(0xFFFF_FFF0, "big")]),
    );
    assert!(matches!(result, Err(Error::AddressSpaceExhausted { .. })));
}

#[test]
fn symbol_defined_twice_is_fatal() {
    let a = object(
        vec![section("text", vec![0; 4], Vec::new())],
        vec![defined("foo", 0, "text")],
    );
    let b = object(
        vec![section("text", vec![0; 4], Vec::new())],
        vec![defined("foo", 0, "text")],
    );

    let result = link(
        vec![("a.o".to_owned(), a), ("b.o".to_owned(), b)],
        &BTreeMap::new(),
    );
    assert!(matches!(result, Err(Error::DuplicateSymbol(name)) if name == "foo"));
}

#[test]
fn globally_undefined_symbol_is_fatal() {
    let a = object(vec![section("text", vec![0; 4], Vec::new())], vec![undefined("foo")]);

    let result = link(vec![("a.o".to_owned(), a)], &BTreeMap::new());
    assert!(matches!(result, Err(Error::UndefinedSymbol(name)) if name == "foo"));
}

#[test]
fn definition_wins_over_import_in_either_order() {
    for flipped in &[false, true] {
        let importer = object(
            vec![section(
                "text",
                vec![0; 4],
                vec![sobj::Relocation {
                    offset: 0,
                    addend: 0,
                    name: "foo".to_owned(),
                }],
            )],
            vec![undefined("foo")],
        );
        let definer = object(
            vec![section("data", vec![0; 8], Vec::new())],
            vec![defined("foo", 4, "data")],
        );

        let objects = if *flipped {
            vec![("def.o".to_owned(), definer), ("imp.o".to_owned(), importer)]
        } else {
            vec![("imp.o".to_owned(), importer), ("def.o".to_owned(), definer)]
        };

        let image = link(objects, &placements(&[(0x1000, "text")])).unwrap();

        // foo = data location + 4; text is at 0x1000 and data follows it
        let text = &image[&0x1000];
        let expected = 0x1004u32 + 4;
        assert_eq!(&text[0..4], &expected.to_le_bytes());
    }
}

#[test]
fn section_relative_relocation_resolves_within_the_same_module() {
    // module a refers from text to its own data section; module b also has a
    // data section, which must not be picked up
    let a = object(
        vec![
            section(
                "text",
                vec![0; 4],
                vec![sobj::Relocation {
                    offset: 0,
                    addend: 8,
                    name: "data".to_owned(),
                }],
            ),
            section("data", vec![0; 16], Vec::new()),
        ],
        Vec::new(),
    );
    let b = object(vec![section("data", vec![0; 16], Vec::new())], Vec::new());

    let image = link(
        vec![("a.o".to_owned(), a), ("b.o".to_owned(), b)],
        &BTreeMap::new(),
    )
    .unwrap();

    // layout: a.text @ 0, a.data @ 4, b.data @ 20
    let text = &image[&0];
    assert_eq!(&text[0..4], &12u32.to_le_bytes());
}

#[test]
fn relocation_against_an_unknown_name_is_fatal() {
    let a = object(
        vec![section(
            "text",
            vec![0; 4],
            vec![sobj::Relocation {
                offset: 0,
                addend: 0,
                name: "nowhere".to_owned(),
            }],
        )],
        Vec::new(),
    );

    let result = link(vec![("a.o".to_owned(), a)], &BTreeMap::new());
    assert!(matches!(result, Err(Error::UnknownRelocation { .. })));
}

#[test]
fn relocation_outside_its_section_is_fatal() {
    let a = object(
        vec![section(
            "text",
            vec![0; 4],
            vec![sobj::Relocation {
                offset: 2,
                addend: 0,
                name: "text".to_owned(),
            }],
        )],
        Vec::new(),
    );

    let result = link(vec![("a.o".to_owned(), a)], &BTreeMap::new());
    assert!(matches!(result, Err(Error::BadRelocation { .. })));
}

#[test]
fn gaps_between_placements_stay_unpadded() {
    let a = object(
        vec![
            section("lo", vec![1; 4], Vec::new()),
            section("hi", vec![2; 4], Vec::new()),
        ],
        Vec::new(),
    );

    let image = link(
        vec![("a.o".to_owned(), a)],
        &placements(&[(0x100, "lo"), (0x2000, "hi")]),
    )
    .unwrap();

    let addresses: Vec<u32> = image.keys().copied().collect();
    assert_eq!(addresses, vec![0x100, 0x2000]);
}
