use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, Stream, dictionary};

use crate::outline::{PageLines, TextLine};

pub const FIXTURE_PAGE_WIDTH: i64 = 612;
pub const FIXTURE_PAGE_HEIGHT: f32 = 792.0;

#[derive(Debug, Clone)]
pub struct FixtureLine {
    pub text: String,
    pub x: f32,
    pub top: f32,
    pub size: f32,
    pub bold: bool,
}

impl FixtureLine {
    pub fn at_x(mut self, x: f32) -> Self {
        self.x = x;
        self
    }
}

pub struct FixtureForm {
    pub name: &'static str,
    pub matrix: [f32; 6],
    pub operations: Vec<Operation>,
}

pub fn line(text: &str, top: f32, size: f32, bold: bool) -> FixtureLine {
    FixtureLine {
        text: text.to_string(),
        x: 72.0,
        top,
        size,
        bold,
    }
}

pub fn text_object(text: &str, size: f32, bold: bool, matrix: [f32; 6]) -> Vec<Operation> {
    let font = if bold { "F2" } else { "F1" };
    vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec![font.into(), size.into()]),
        Operation::new("Tm", real_array(matrix)),
        Operation::new("Tj", vec![Object::string_literal(text)]),
        Operation::new("ET", vec![]),
    ]
}

pub fn operation(operator: &str, operands: &[f32]) -> Operation {
    Operation::new(operator, operands.iter().map(|&value| value.into()).collect())
}

fn real_array(values: [f32; 6]) -> Vec<Object> {
    values.iter().map(|&value| value.into()).collect()
}

pub fn build_pdf(pages: &[Vec<FixtureLine>]) -> Vec<u8> {
    let pages = pages
        .iter()
        .map(|lines| {
            lines
                .iter()
                .flat_map(|fixture| {
                    let baseline = FIXTURE_PAGE_HEIGHT - fixture.top - 0.8 * fixture.size;
                    text_object(
                        &fixture.text,
                        fixture.size,
                        fixture.bold,
                        [1.0, 0.0, 0.0, 1.0, fixture.x, baseline],
                    )
                })
                .collect()
        })
        .collect::<Vec<Vec<Operation>>>();
    build_pdf_from_operations(pages, Vec::new())
}

pub fn build_pdf_from_operations(pages: Vec<Vec<Operation>>, forms: Vec<FixtureForm>) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let bold_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });

    let mut xobjects = Dictionary::new();
    for form in forms {
        let content = Content {
            operations: form.operations,
        };
        let form_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Form",
                "BBox" => vec![0.into(), 0.into(), FIXTURE_PAGE_WIDTH.into(), (FIXTURE_PAGE_HEIGHT as i64).into()],
                "Matrix" => real_array(form.matrix),
            },
            content.encode().expect("fixture form encodes"),
        ));
        xobjects.set(form.name, form_id);
    }

    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular_id,
            "F2" => bold_id,
        },
        "XObject" => xobjects,
    });

    let mut kids = Vec::<Object>::new();
    for operations in pages {
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("fixture content encodes"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(page_id.into());
    }

    let page_count = kids.len() as i64;
    let pages_dict = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => page_count,
        "MediaBox" => vec![
            0.into(),
            0.into(),
            FIXTURE_PAGE_WIDTH.into(),
            (FIXTURE_PAGE_HEIGHT as i64).into(),
        ],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).expect("fixture document saves");
    buffer
}

pub fn text_line(text: &str, page_number: u32, y_position: f32, font_size: f32, is_bold: bool) -> TextLine {
    TextLine {
        text: text.to_string(),
        page_number,
        y_position,
        font_size,
        is_bold,
    }
}

pub fn page(page_number: u32, lines: Vec<TextLine>) -> PageLines {
    PageLines {
        page_number,
        page_height: FIXTURE_PAGE_HEIGHT,
        lines,
    }
}
