//! Slide-deck writer: a title slide carrying the summary lines, then one
//! slide per chart image.

use super::{
    REPORT_TITLE,
    ooxml::{Package, escape_xml},
    png,
};
use crate::{charts::ChartImage, error::Result};

const EMU_PER_INCH: i64 = 914_400;
const SLIDE_WIDTH: i64 = 10 * EMU_PER_INCH;
const SLIDE_HEIGHT: i64 = 7 * EMU_PER_INCH + EMU_PER_INCH / 2;
const PICTURE_LEFT: i64 = EMU_PER_INCH;
const PICTURE_TOP: i64 = EMU_PER_INCH;
const PICTURE_WIDTH: i64 = 8 * EMU_PER_INCH;

const NS: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;
const REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const REL_TYPE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const PML: &str = "application/vnd.openxmlformats-officedocument.presentationml";

const EMPTY_TREE: &str = r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>"#;

const THEME: &str = r#"<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="Report"><a:themeElements><a:clrScheme name="Report"><a:dk1><a:srgbClr val="000000"/></a:dk1><a:lt1><a:srgbClr val="FFFFFF"/></a:lt1><a:dk2><a:srgbClr val="1F497D"/></a:dk2><a:lt2><a:srgbClr val="EEECE1"/></a:lt2><a:accent1><a:srgbClr val="4F81BD"/></a:accent1><a:accent2><a:srgbClr val="C0504D"/></a:accent2><a:accent3><a:srgbClr val="9BBB59"/></a:accent3><a:accent4><a:srgbClr val="8064A2"/></a:accent4><a:accent5><a:srgbClr val="4BACC6"/></a:accent5><a:accent6><a:srgbClr val="F79646"/></a:accent6><a:hlink><a:srgbClr val="0000FF"/></a:hlink><a:folHlink><a:srgbClr val="800080"/></a:folHlink></a:clrScheme><a:fontScheme name="Report"><a:majorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:majorFont><a:minorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:minorFont></a:fontScheme><a:fmtScheme name="Report"><a:fillStyleLst><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:fillStyleLst><a:lnStyleLst><a:ln w="9525"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln><a:ln w="25400"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln><a:ln w="38100"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln></a:lnStyleLst><a:effectStyleLst><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle></a:effectStyleLst><a:bgFillStyleLst><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:bgFillStyleLst></a:fmtScheme></a:themeElements></a:theme>"#;

struct Media {
    width: u32,
    height: u32,
}

fn relationships(entries: &[(&str, String)]) -> String {
    let mut xml = format!(r#"<Relationships xmlns="{REL_NS}">"#);
    for (idx, (kind, target)) in entries.iter().enumerate() {
        xml.push_str(&format!(
            r#"<Relationship Id="rId{}" Type="{REL_TYPE}/{kind}" Target="{target}"/>"#,
            idx + 1
        ));
    }
    xml.push_str("</Relationships>");
    xml
}

fn content_types(slide_count: usize) -> String {
    let mut xml = String::from(
        r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Default Extension="png" ContentType="image/png"/>"#,
    );
    let overrides = [
        ("/ppt/presentation.xml", format!("{PML}.presentation.main+xml")),
        ("/ppt/slideMasters/slideMaster1.xml", format!("{PML}.slideMaster+xml")),
        ("/ppt/slideLayouts/slideLayout1.xml", format!("{PML}.slideLayout+xml")),
        (
            "/ppt/theme/theme1.xml",
            "application/vnd.openxmlformats-officedocument.theme+xml".to_string(),
        ),
    ];
    for (part, kind) in overrides {
        xml.push_str(&format!(r#"<Override PartName="{part}" ContentType="{kind}"/>"#));
    }
    for n in 1..=slide_count {
        xml.push_str(&format!(
            r#"<Override PartName="/ppt/slides/slide{n}.xml" ContentType="{PML}.slide+xml"/>"#
        ));
    }
    xml.push_str("</Types>");
    xml
}

fn presentation(slide_count: usize) -> String {
    let slides = (1..=slide_count)
        .map(|n| format!(r#"<p:sldId id="{}" r:id="rId{}"/>"#, 255 + n, n + 2))
        .collect::<String>();
    format!(
        r#"<p:presentation {NS}><p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst><p:sldIdLst>{slides}</p:sldIdLst><p:sldSz cx="{SLIDE_WIDTH}" cy="{SLIDE_HEIGHT}" type="screen4x3"/><p:notesSz cx="{SLIDE_HEIGHT}" cy="{SLIDE_WIDTH}"/></p:presentation>"#
    )
}

fn slide_master() -> String {
    format!(
        r#"<p:sldMaster {NS}><p:cSld><p:spTree>{EMPTY_TREE}</p:spTree></p:cSld><p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" hlink="hlink" folHlink="folHlink"/><p:sldLayoutIdLst><p:sldLayoutId id="2147483649" r:id="rId1"/></p:sldLayoutIdLst></p:sldMaster>"#
    )
}

fn slide_layout() -> String {
    format!(
        r#"<p:sldLayout {NS} type="titleOnly" preserve="1"><p:cSld name="Title Only"><p:spTree>{EMPTY_TREE}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sldLayout>"#
    )
}

fn text_shape(id: u32, name: &str, placeholder: bool, frame: (i64, i64, i64, i64), paragraphs: &[&str]) -> String {
    let (x, y, cx, cy) = frame;
    let nv_pr = if placeholder {
        r#"<p:nvPr><p:ph type="title"/></p:nvPr>"#
    } else {
        "<p:nvPr/>"
    };
    let body = paragraphs
        .iter()
        .map(|text| {
            format!(
                r#"<a:p><a:r><a:rPr lang="en-US" sz="{}" dirty="0"/><a:t>{}</a:t></a:r></a:p>"#,
                if placeholder { 3600 } else { 1800 },
                escape_xml(text)
            )
        })
        .collect::<String>();
    format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="{name}"/><p:cNvSpPr txBox="{}"/>{nv_pr}</p:nvSpPr><p:spPr><a:xfrm><a:off x="{x}" y="{y}"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom></p:spPr><p:txBody><a:bodyPr wrap="square"/><a:lstStyle/>{body}</p:txBody></p:sp>"#,
        u8::from(!placeholder)
    )
}

fn title_slide(lines: &[String]) -> String {
    let title = text_shape(
        2,
        "Title",
        true,
        (EMU_PER_INCH / 2, EMU_PER_INCH / 4, 9 * EMU_PER_INCH, EMU_PER_INCH),
        &[REPORT_TITLE],
    );
    let paragraphs = lines.iter().map(String::as_str).collect::<Vec<_>>();
    let summary = text_shape(
        3,
        "Summary",
        false,
        (
            EMU_PER_INCH / 2,
            EMU_PER_INCH * 3 / 2,
            9 * EMU_PER_INCH,
            EMU_PER_INCH * 5,
        ),
        &paragraphs,
    );
    format!(r#"<p:sld {NS}><p:cSld><p:spTree>{EMPTY_TREE}{title}{summary}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"#)
}

fn picture_slide(number: usize, media: &Media) -> String {
    let max_height = SLIDE_HEIGHT - PICTURE_TOP - EMU_PER_INCH / 2;
    let mut cx = PICTURE_WIDTH;
    let mut cy = PICTURE_WIDTH * i64::from(media.height) / i64::from(media.width);
    if cy > max_height {
        cx = cx * max_height / cy;
        cy = max_height;
    }
    format!(
        r#"<p:sld {NS}><p:cSld><p:spTree>{EMPTY_TREE}<p:pic><p:nvPicPr><p:cNvPr id="2" name="Chart {number}"/><p:cNvPicPr><a:picLocks noChangeAspect="1"/></p:cNvPicPr><p:nvPr/></p:nvPicPr><p:blipFill><a:blip r:embed="rId2"/><a:stretch><a:fillRect/></a:stretch></p:blipFill><p:spPr><a:xfrm><a:off x="{PICTURE_LEFT}" y="{PICTURE_TOP}"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom></p:spPr></p:pic></p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"#
    )
}

pub fn write_deck(lines: &[String], images: &[ChartImage]) -> Result<Vec<u8>> {
    let media = images
        .iter()
        .map(|image| {
            png::parse(&image.png).map(|decoded| Media {
                width: decoded.width,
                height: decoded.height,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    let slide_count = images.len() + 1;

    let mut package = Package::new("pptx");
    package.add_xml("[Content_Types].xml", &content_types(slide_count))?;
    package.add_xml(
        "_rels/.rels",
        &relationships(&[("officeDocument", "ppt/presentation.xml".to_string())]),
    )?;
    package.add_xml("ppt/presentation.xml", &presentation(slide_count))?;

    let mut presentation_rels = vec![
        ("slideMaster", "slideMasters/slideMaster1.xml".to_string()),
        ("theme", "theme/theme1.xml".to_string()),
    ];
    presentation_rels.extend((1..=slide_count).map(|n| ("slide", format!("slides/slide{n}.xml"))));
    package.add_xml("ppt/_rels/presentation.xml.rels", &relationships(&presentation_rels))?;

    package.add_xml("ppt/slideMasters/slideMaster1.xml", &slide_master())?;
    package.add_xml(
        "ppt/slideMasters/_rels/slideMaster1.xml.rels",
        &relationships(&[
            ("slideLayout", "../slideLayouts/slideLayout1.xml".to_string()),
            ("theme", "../theme/theme1.xml".to_string()),
        ]),
    )?;
    package.add_xml("ppt/slideLayouts/slideLayout1.xml", &slide_layout())?;
    package.add_xml(
        "ppt/slideLayouts/_rels/slideLayout1.xml.rels",
        &relationships(&[("slideMaster", "../slideMasters/slideMaster1.xml".to_string())]),
    )?;
    package.add_xml("ppt/theme/theme1.xml", THEME)?;

    let layout_rel = ("slideLayout", "../slideLayouts/slideLayout1.xml".to_string());
    package.add_xml("ppt/slides/slide1.xml", &title_slide(lines))?;
    package.add_xml(
        "ppt/slides/_rels/slide1.xml.rels",
        &relationships(std::slice::from_ref(&layout_rel)),
    )?;

    for (idx, (image, media)) in images.iter().zip(&media).enumerate() {
        let number = idx + 2;
        let media_name = format!("image{}.png", idx + 1);
        package.add(&format!("ppt/media/{media_name}"), &image.png)?;
        package.add_xml(&format!("ppt/slides/slide{number}.xml"), &picture_slide(number, media))?;
        package.add_xml(
            &format!("ppt/slides/_rels/slide{number}.xml.rels"),
            &relationships(&[layout_rel.clone(), ("image", format!("../media/{media_name}"))]),
        )?;
    }
    package.finish()
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Read};

    use zip::ZipArchive;

    use super::*;
    use crate::{charts::ChartKind, report::png::encode_test_png};

    fn read_entry(archive: &mut ZipArchive<Cursor<Vec<u8>>>, name: &str) -> String {
        let mut text = String::new();
        archive
            .by_name(name)
            .unwrap()
            .read_to_string(&mut text)
            .unwrap();
        text
    }

    #[test]
    fn deck_has_title_slide_and_one_slide_per_image() {
        let images = vec![
            ChartImage {
                kind: ChartKind::DailyRevenue,
                png: encode_test_png(20, 10, 2),
            },
            ChartImage {
                kind: ChartKind::TopProducts,
                png: encode_test_png(10, 30, 0),
            },
        ];
        let lines = vec!["Sales Report".to_string(), "Top product : R&D".to_string()];
        let bytes = write_deck(&lines, &images).unwrap();
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();

        for name in [
            "[Content_Types].xml",
            "ppt/presentation.xml",
            "ppt/slides/slide1.xml",
            "ppt/slides/slide2.xml",
            "ppt/slides/slide3.xml",
            "ppt/media/image1.png",
            "ppt/media/image2.png",
        ] {
            assert!(archive.by_name(name).is_ok(), "missing {name}");
        }
        assert!(archive.by_name("ppt/slides/slide4.xml").is_err());

        let title = read_entry(&mut archive, "ppt/slides/slide1.xml");
        assert!(title.contains("<a:t>Sales Report</a:t>"));
        assert!(title.contains("Top product : R&amp;D"));
        let presentation = read_entry(&mut archive, "ppt/presentation.xml");
        assert_eq!(presentation.matches("<p:sldId ").count(), 3);
        let rels = read_entry(&mut archive, "ppt/slides/_rels/slide3.xml.rels");
        assert!(rels.contains("../media/image2.png"));
    }

    #[test]
    fn picture_keeps_aspect_ratio_within_the_slide() {
        let wide = picture_slide(2, &Media { width: 800, height: 400 });
        assert!(wide.contains(&format!(r#"cx="{PICTURE_WIDTH}" cy="{}""#, PICTURE_WIDTH / 2)));
        let tall = picture_slide(2, &Media { width: 100, height: 1000 });
        let max_height = SLIDE_HEIGHT - PICTURE_TOP - EMU_PER_INCH / 2;
        assert!(tall.contains(&format!(r#"cy="{max_height}""#)));
    }

    #[test]
    fn empty_image_list_yields_title_only_deck() {
        let bytes = write_deck(&["Sales Report".to_string()], &[]).unwrap();
        let archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert!(archive.file_names().all(|name| !name.starts_with("ppt/media/")));
    }
}
